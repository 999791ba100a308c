mod seed;

use crate::geometry::TileCoord;
use serde::{Deserialize, Serialize};
pub use seed::WorldSeed;
use strum::{Display, EnumString};
use validator::Validate;

/// Top-level configuration for a world. Two worlds generated with the same
/// config are guaranteed to produce bit-identical tiles.
///
/// All configuration is injected once, at [`configure`](crate::Supervisor::configure)
/// time; there is no reconfiguration while generation is in flight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct WorldConfig {
    /// RNG seed shared by every generation layer.
    pub world_seed: WorldSeed,

    /// Edge length of a tile, in pixels. Shared for the lifetime of the
    /// world.
    #[validate(range(min = 1, max = 8192))]
    pub tile_size: u32,

    /// Width of the erosion margin around a tile, in pixels.
    #[validate(range(max = 2048))]
    pub padding: u32,

    #[validate]
    pub voronoi_noise: VoronoiNoiseConfig,

    #[validate]
    pub erosion: ErosionConfig,

    #[validate]
    pub streaming: StreamingConfig,

    pub cache: CacheConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            world_seed: WorldSeed(0),
            tile_size: 256,
            padding: 128,
            voronoi_noise: Default::default(),
            erosion: Default::default(),
            streaming: Default::default(),
            cache: Default::default(),
        }
    }
}

/// Configuration for the Voronoi + noise compositor.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct VoronoiNoiseConfig {
    pub seed: u32,

    /// Points per tile. Hard-capped at 10 so the per-pixel point
    /// neighborhood never exceeds 90 (9 tiles * 10 points).
    #[validate(range(max = 10))]
    pub n_points: u16,

    pub voronoi_intensity: f32,
    pub noise_intensity: f32,
    pub enable_voronoi: bool,
    pub enable_noise: bool,

    pub falloff: f32,
    pub ridge_multiplier: f32,
    pub amplitude: f32,
    pub scaling_type: ScalingType,
    pub min_h: f32,
    pub max_h: f32,

    #[validate(range(min = 0.0))]
    pub noise_freq: f32,
    pub noise_octaves: u8,
    pub noise_lacunarity: f32,
    pub noise_persistence: f32,
    pub noise_seed: i32,
}

impl Default for VoronoiNoiseConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            n_points: 4,
            voronoi_intensity: 1.0,
            noise_intensity: 1.0,
            enable_voronoi: true,
            enable_noise: true,
            falloff: 1.0,
            ridge_multiplier: 0.0,
            amplitude: 1.0,
            scaling_type: ScalingType::Linear,
            min_h: 0.0,
            max_h: 1.0,
            noise_freq: 0.02,
            noise_octaves: 4,
            noise_lacunarity: 2.0,
            noise_persistence: 0.5,
            noise_seed: 1,
        }
    }
}

/// Distance-falloff curve applied to the nearest-Voronoi-point distance.
#[derive(
    Copy, Clone, Debug, Display, Eq, PartialEq, Serialize, Deserialize, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScalingType {
    Linear,
    Quadratic,
    Exponential,
    Sigmoid,
    Inverse,
    Power,
    Cosine,
}

impl ScalingType {
    /// Apply this curve to a normalized distance `d` in `[0, 1]` with
    /// falloff parameter `k`.
    pub fn scale(self, d: f32, k: f32) -> f32 {
        match self {
            Self::Linear => 1.0 - d,
            Self::Quadratic => 1.0 - d * d,
            Self::Exponential => (-k * d).exp(),
            Self::Sigmoid => 1.0 / (1.0 + (k * (d - 0.5)).exp()),
            Self::Inverse => 1.0 / (1.0 + k * d),
            Self::Power => (1.0 - d).max(0.0).powf(k),
            Self::Cosine => 0.5 * (1.0 + (d * k * std::f32::consts::PI).cos()),
        }
    }
}

/// Configuration for the droplet erosion simulator.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ErosionConfig {
    pub enabled: bool,

    #[validate(range(min = 0.0, max = 1.0))]
    pub intensity: f32,

    pub droplets_per_tile: u32,
    pub max_lifetime: u32,
    pub sediment_capacity_factor: f32,
    pub min_sediment_capacity: f32,
    pub deposit_speed: f32,
    pub erode_speed: f32,
    pub evaporate_speed: f32,
    pub gravity: f32,
    pub start_speed: f32,
    pub start_water: f32,
    pub inertia: f32,
    pub brush_radius: u32,

    /// The `floor(wx * k)` multiplier used to build a droplet's order key.
    /// Exposed as a named constant rather than hard-coded, since tuning it
    /// changes the apparent "grain" of simultaneous erosion across tiles.
    pub order_key_scale: f64,
}

impl ErosionConfig {
    /// `H_max` used in the `V_max` travel-distance estimate. Named rather
    /// than inlined so the assumption is visible and revisitable.
    pub const H_MAX_ASSUMED: f32 = 1.0;

    /// Estimate of the farthest a droplet can travel in world-space pixels:
    /// `max_lifetime * sqrt(2 * g * H_max)`.
    pub fn max_travel_distance(&self) -> f32 {
        self.max_lifetime as f32 * (2.0 * self.gravity * Self::H_MAX_ASSUMED).sqrt()
    }
}

impl Default for ErosionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            intensity: 1.0,
            droplets_per_tile: 400,
            max_lifetime: 30,
            sediment_capacity_factor: 4.0,
            min_sediment_capacity: 0.01,
            deposit_speed: 0.3,
            erode_speed: 0.3,
            evaporate_speed: 0.01,
            gravity: 4.0,
            start_speed: 1.0,
            start_water: 1.0,
            inertia: 0.05,
            brush_radius: 2,
            order_key_scale: 1000.0,
        }
    }
}

/// Configuration for component E, the streaming supervisor.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StreamingConfig {
    #[validate(range(min = 1, max = 64))]
    pub batch_size: u32,

    pub edge_threshold: u32,

    #[validate(range(min = 1))]
    pub max_cached_batches: usize,

    pub initial_tile: TileCoord,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            batch_size: 8,
            edge_threshold: 2,
            max_cached_batches: 4,
            initial_tile: TileCoord::ORIGIN,
        }
    }
}

/// Configuration for component D, the on-disk tile cache.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub root_path: std::path::PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            root_path: std::path::PathBuf::from("./tile_cache"),
        }
    }
}
