//! Typed errors surfaced to callers. Only
//! [`configure`](crate::stream::Supervisor::configure) returns a typed,
//! caller-inspectable error; every other fallible operation in this crate
//! uses [`anyhow::Result`], since those failures are internal bugs rather
//! than something a caller is expected to branch on.

use std::path::PathBuf;
use thiserror::Error;

/// A configuration error, returned from `configure()` before any state is
/// installed. The caller must fix the parameter and retry; there is no
/// partial-configure state to recover from.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid world config: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("cache root {path:?} could not be created: {source}")]
    CacheRootUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tile_size_S must be greater than zero")]
    ZeroTileSize,

    #[error("n_points ({0}) exceeds the hard cap of 10 points per tile")]
    TooManyVoronoiPoints(u16),
}
