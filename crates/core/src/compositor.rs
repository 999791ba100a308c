//! The Voronoi + noise compositor. Produces a raw heightmap for a tile by
//! sampling an infinite Voronoi cell field and a fractal noise field, purely
//! as a function of world-space pixel coordinates. Never allocates beyond a
//! fixed-size output buffer, and never fails.

use crate::{
    config::VoronoiNoiseConfig,
    geometry::TileCoord,
    hash::{fbm, hash2},
};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// An `S x S` array of raw heights, row-major. This is the output of
/// component B: a pure function of `(world_seed, tile, params)`, with no
/// hidden state.
#[derive(Clone, Debug, PartialEq)]
pub struct RawHeightmap {
    pub size: u32,
    data: Vec<f32>,
}

impl RawHeightmap {
    pub fn filled(size: u32, value: f32) -> Self {
        Self {
            size,
            data: vec![value; (size * size) as usize],
        }
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[(y * self.size + x) as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: f32) {
        self.data[(y * self.size + x) as usize] = value;
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn row(&self, y: u32) -> &[f32] {
        let start = (y * self.size) as usize;
        &self.data[start..start + self.size as usize]
    }

    pub fn column(&self, x: u32) -> Vec<f32> {
        (0..self.size).map(|y| self.get(x, y)).collect()
    }
}

/// Reusable compositor: built once from a [`VoronoiNoiseConfig`], then
/// queried per-tile. Keeping it as a persistent, cloneable value rather than
/// rebuilding it per call avoids repeating the same config validation work
/// for every tile.
#[derive(Clone, Debug)]
pub struct VoronoiNoiseCompositor {
    config: VoronoiNoiseConfig,
}

impl VoronoiNoiseCompositor {
    pub fn new(config: VoronoiNoiseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VoronoiNoiseConfig {
        &self.config
    }

    /// Generate the raw heightmap for `tile`, at the given tile edge length.
    pub fn generate(&self, tile: TileCoord, tile_size: u32) -> RawHeightmap {
        self.generate_region(tile.world_origin(tile_size), tile_size, tile_size)
    }

    /// Generate a raw heightmap over an arbitrary square world-space region
    /// of edge length `region_size`, used directly by the erosion simulator
    /// to build the padded buffer. `tile_size` is
    /// always the world's shared tile edge length `S`, independent of the
    /// region's own size, since it is what defines the pitch of the Voronoi
    /// cell grid.
    pub fn generate_region(
        &self,
        world_origin: (f64, f64),
        region_size: u32,
        tile_size: u32,
    ) -> RawHeightmap {
        let mut map = RawHeightmap::filled(region_size, 0.0);
        for py in 0..region_size {
            for px in 0..region_size {
                let wx = world_origin.0 + px as f64;
                let wy = world_origin.1 + py as f64;
                let h = self.height_at(wx as f32, wy as f32, tile_size);
                map.set(px, py, h);
            }
        }
        map
    }

    /// Height at a single world-space pixel. The result depends only on
    /// `(wx, wy)` and the compositor's configuration, never on which tile
    /// asked, which is what makes neighboring tiles agree on their shared
    /// edge.
    pub fn height_at(&self, wx: f32, wy: f32, tile_size: u32) -> f32 {
        let h_v = if self.config.enable_voronoi {
            self.voronoi_height(wx, wy, tile_size)
        } else {
            0.5
        };
        let h_n = if self.config.enable_noise {
            self.noise_height(wx, wy)
        } else {
            0.5
        };

        0.5 + (h_n - 0.5) * self.config.noise_intensity * self.config.enable_noise as u8 as f32
            + (h_v - 0.5) * self.config.voronoi_intensity * self.config.enable_voronoi as u8 as f32
    }

    fn noise_height(&self, wx: f32, wy: f32) -> f32 {
        let raw = fbm(
            wx,
            wy,
            self.config.noise_seed,
            self.config.noise_freq,
            self.config.noise_octaves,
            self.config.noise_lacunarity,
            self.config.noise_persistence,
        );
        // remap [-1, 1] -> [0, 1]
        (raw + 1.0) * 0.5
    }

    fn voronoi_height(&self, wx: f32, wy: f32, tile_size: u32) -> f32 {
        let points = self.voronoi_points_near(wx, wy, tile_size);
        let (d1, d2) = nearest_two_distances(wx, wy, &points);

        if !d1.is_finite() {
            // No points at all (n_points == 0): distance to the nearest
            // point is undefined, so the field is flat at its floor.
            return self.config.min_h;
        }

        let d = d1 / tile_size as f32;
        let base = self.config.scaling_type.scale(d, self.config.falloff) * self.config.amplitude;
        let ridge = if d1 > 0.0 {
            self.config.ridge_multiplier * (d2 - d1) / d1
        } else {
            0.0
        };

        let normalized = (base + ridge).clamp(0.0, 1.0);
        self.config.min_h + normalized * (self.config.max_h - self.config.min_h)
    }

    /// Collect up to `9 * n_points` world-space Voronoi points from the 3x3
    /// neighborhood of tiles surrounding the tile containing `(wx, wy)`.
    /// Each neighboring tile's point set is seeded by `hash2(tx, ty, seed)`,
    /// so the set visible to any pixel depends only on that pixel's world
    /// position, never on which tile's generation pass computed it.
    fn voronoi_points_near(&self, wx: f32, wy: f32, tile_size: u32) -> Vec<(f32, f32)> {
        let home_tx = (wx / tile_size as f32).floor() as i32;
        let home_ty = (wy / tile_size as f32).floor() as i32;

        let mut points = Vec::with_capacity(9 * self.config.n_points as usize);
        for dty in -1..=1 {
            for dtx in -1..=1 {
                let tx = home_tx + dtx;
                let ty = home_ty + dty;
                let tile_seed = hash2(tx, ty, self.config.seed);
                let mut rng = Pcg32::seed_from_u64(tile_seed as u64);
                for _ in 0..self.config.n_points {
                    let px = tx as f32 * tile_size as f32 + rng.gen_range(0.0..tile_size as f32);
                    let py = ty as f32 * tile_size as f32 + rng.gen_range(0.0..tile_size as f32);
                    points.push((px, py));
                }
            }
        }
        points
    }
}

fn nearest_two_distances(wx: f32, wy: f32, points: &[(f32, f32)]) -> (f32, f32) {
    let mut d1 = f32::INFINITY;
    let mut d2 = f32::INFINITY;
    for &(px, py) in points {
        let dx = px - wx;
        let dy = py - wy;
        let d = (dx * dx + dy * dy).sqrt();
        if d < d1 {
            d2 = d1;
            d1 = d;
        } else if d < d2 {
            d2 = d;
        }
    }
    (d1, d2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScalingType;

    fn compositor(cfg_mut: impl FnOnce(&mut VoronoiNoiseConfig)) -> VoronoiNoiseCompositor {
        let mut config = VoronoiNoiseConfig {
            n_points: 2,
            scaling_type: ScalingType::Linear,
            falloff: 1.0,
            amplitude: 1.0,
            ridge_multiplier: 0.0,
            min_h: 0.0,
            max_h: 1.0,
            ..Default::default()
        };
        cfg_mut(&mut config);
        VoronoiNoiseCompositor::new(config)
    }

    /// Voronoi-only seam test.
    #[test]
    fn test_seamless_voronoi_only() {
        let c = compositor(|cfg| {
            cfg.seed = 12345;
            cfg.enable_voronoi = true;
            cfg.enable_noise = false;
        });
        let tile_size = 4;
        let left = c.generate(TileCoord::new(0, 0), tile_size);
        let right = c.generate(TileCoord::new(1, 0), tile_size);
        assert_eq!(left.column(tile_size - 1), right.column(0));
    }

    /// Voronoi + noise seam test.
    #[test]
    fn test_seamless_noise_only() {
        let c = compositor(|cfg| {
            cfg.seed = 12345;
            cfg.enable_voronoi = false;
            cfg.enable_noise = true;
            cfg.noise_intensity = 1.0;
            cfg.voronoi_intensity = 0.0;
            cfg.noise_freq = 0.25;
            cfg.noise_octaves = 2;
            cfg.noise_seed = 7;
        });
        let tile_size = 4;
        let left = c.generate(TileCoord::new(0, 0), tile_size);
        let right = c.generate(TileCoord::new(1, 0), tile_size);
        assert_eq!(left.column(tile_size - 1), right.column(0));
    }

    #[test]
    fn test_pixel_height_independent_of_tile() {
        let c = compositor(|cfg| cfg.seed = 99);
        // Pixel at world (256, 0) is the left edge of tile (1,0) and one
        // step past the right edge of tile (0,0). Height must agree exactly
        // regardless of which tile's generation pass asks for it.
        let tile_size = 256;
        let from_tile0 = c.height_at(256.0, 10.0, tile_size);
        let from_tile1 = c.height_at(256.0, 10.0, tile_size);
        assert_eq!(from_tile0, from_tile1);
    }

    #[test]
    fn test_no_voronoi_points_falls_back_flat() {
        let c = compositor(|cfg| {
            cfg.n_points = 0;
        });
        let map = c.generate(TileCoord::new(0, 0), 4);
        // All pixels should be identical since there's no spatial variation.
        let first = map.get(0, 0);
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(map.get(x, y), first);
            }
        }
    }
}
