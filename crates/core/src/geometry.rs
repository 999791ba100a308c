//! Coordinate types shared by every layer of the pipeline.

use derive_more::Display;
use serde::{Deserialize, Serialize};
#[cfg(feature = "js")]
use wasm_bindgen::prelude::*;

/// Integer lattice index of a tile. Two tiles are neighbors iff they differ
/// by 1 in exactly one axis. The world-space extent of a tile is
/// `[tx*S, (tx+1)*S) x [ty*S, (ty+1)*S)` for tile edge length `S`.
#[cfg_attr(feature = "js", wasm_bindgen)]
#[derive(
    Copy, Clone, Debug, Default, Display, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[display(fmt = "({tx}, {ty})")]
pub struct TileCoord {
    pub tx: i32,
    pub ty: i32,
}

impl TileCoord {
    pub const ORIGIN: Self = Self { tx: 0, ty: 0 };

    pub fn new(tx: i32, ty: i32) -> Self {
        Self { tx, ty }
    }

    /// World-space coordinate of this tile's minimum corner, for a given
    /// tile edge length.
    pub fn world_origin(self, tile_size: u32) -> (f64, f64) {
        (
            self.tx as f64 * tile_size as f64,
            self.ty as f64 * tile_size as f64,
        )
    }

    /// Squared Euclidean distance to another tile coordinate, used to order
    /// the center-outward spiral traversal of a batch.
    pub fn dist_sq(self, other: Self) -> i64 {
        let dx = (self.tx - other.tx) as i64;
        let dy = (self.ty - other.ty) as i64;
        dx * dx + dy * dy
    }

    /// `true` iff `self` and `other` differ by exactly 1 along a single
    /// axis.
    pub fn is_neighbor(self, other: Self) -> bool {
        let dx = (self.tx - other.tx).abs();
        let dy = (self.ty - other.ty).abs();
        (dx == 1 && dy == 0) || (dx == 0 && dy == 1)
    }
}

impl From<(i32, i32)> for TileCoord {
    fn from((tx, ty): (i32, i32)) -> Self {
        Self { tx, ty }
    }
}

/// A rectangular region of tile coordinates: `extent.0 x extent.1` tiles,
/// with `origin` at the minimum corner.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchRegion {
    pub origin: TileCoord,
    pub extent: (u32, u32),
}

impl BatchRegion {
    pub fn new(origin: TileCoord, extent: (u32, u32)) -> Self {
        Self { origin, extent }
    }

    /// Construct a square region of side `size` centered as closely as
    /// possible on `center`.
    pub fn centered(center: TileCoord, size: u32) -> Self {
        let half = (size / 2) as i32;
        Self {
            origin: TileCoord::new(center.tx - half, center.ty - half),
            extent: (size, size),
        }
    }

    pub fn center(&self) -> TileCoord {
        TileCoord::new(
            self.origin.tx + self.extent.0 as i32 / 2,
            self.origin.ty + self.extent.1 as i32 / 2,
        )
    }

    pub fn contains(&self, coord: TileCoord) -> bool {
        coord.tx >= self.origin.tx
            && coord.tx < self.origin.tx + self.extent.0 as i32
            && coord.ty >= self.origin.ty
            && coord.ty < self.origin.ty + self.extent.1 as i32
    }

    /// Distance (in tiles) from `coord` to the nearest edge of this region,
    /// where a negative value means `coord` is outside the region.
    pub fn distance_to_edge(&self, coord: TileCoord) -> i32 {
        let left = coord.tx - self.origin.tx;
        let right = (self.origin.tx + self.extent.0 as i32 - 1) - coord.tx;
        let bottom = coord.ty - self.origin.ty;
        let top = (self.origin.ty + self.extent.1 as i32 - 1) - coord.ty;
        left.min(right).min(bottom).min(top)
    }

    /// All tile coordinates in this region, in the spiral-from-center order
    /// the batch generation protocol requires: ascending squared distance to
    /// the region's center.
    pub fn spiral_order(&self) -> Vec<TileCoord> {
        let center = self.center();
        let mut tiles: Vec<TileCoord> = (0..self.extent.1 as i32)
            .flat_map(|dy| {
                (0..self.extent.0 as i32).map(move |dx| {
                    TileCoord::new(self.origin.tx + dx, self.origin.ty + dy)
                })
            })
            .collect();
        tiles.sort_by_key(|&t| t.dist_sq(center));
        tiles
    }
}

/// A 2D vector, used for droplet position/direction and consumer
/// position/velocity. A thin alias over [`nalgebra::Vector2`] so the erosion
/// simulator gets normalization/arithmetic for free.
pub type Vec2 = nalgebra::Vector2<f32>;
/// 3D vector, used for the consumer's world position/velocity (the vertical
/// axis is ignored by every generator in this crate, but the consumer API
/// accepts it so a renderer can pass its camera state through unchanged).
pub type Vec3 = nalgebra::Vector3<f32>;
