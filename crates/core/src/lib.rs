//! Fluvion generates an infinite, deterministic, seamlessly-tileable 2D
//! heightfield world: a global fractal noise and hash core, a world-space
//! Voronoi cell field compositor, a padded particle-based hydraulic erosion
//! simulator, an on-disk tile cache, and a streaming supervisor that feeds
//! tiles to a moving consumer.
//!
//! Two worlds built from the same [`config::WorldConfig`] are guaranteed to
//! produce bit-identical tiles, and any two adjacent tiles agree exactly on
//! their shared edge, no matter which tile's generation pass ran first.
//!
//! The typical entry point is [`stream::Supervisor`]: configure one with a
//! [`config::WorldConfig`], call [`stream::Supervisor::start_initial_batch`]
//! once, then poll [`stream::Supervisor::tick`] from a game loop with the
//! consumer's current position and velocity each frame to get back whatever
//! tiles are currently resident in its 3x3 neighborhood.

pub mod cache;
pub mod compositor;
pub mod config;
pub mod erosion;
pub mod error;
pub mod geometry;
pub mod hash;
#[cfg(feature = "js")]
pub mod js;
pub mod stream;

pub use cache::{read_raster, write_raster, CacheStats, DiskUsage, TileCache};
pub use compositor::{RawHeightmap, VoronoiNoiseCompositor};
pub use config::{
    CacheConfig, ErosionConfig, ScalingType, StreamingConfig, VoronoiNoiseConfig, WorldConfig,
    WorldSeed,
};
pub use erosion::{ErodedHeightmap, ErosionKernel, ErosionSimulator};
pub use error::ConfigError;
pub use geometry::{BatchRegion, TileCoord};
pub use stream::{MemoryTile, StreamEvent, Supervisor};
