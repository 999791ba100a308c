//! Events emitted by the streaming supervisor as batches progress.

use crate::geometry::{BatchRegion, TileCoord};

/// Progress notification emitted by [`super::Supervisor`] as it works
/// through a batch.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// A new batch has begun generating.
    BatchStarted { region: BatchRegion },
    /// A single tile finished: either pulled from cache or freshly
    /// generated and eroded.
    TileCompleted { coord: TileCoord, from_cache: bool },
    /// Every tile in `region` is now resident in memory.
    BatchCompleted { region: BatchRegion },
}
