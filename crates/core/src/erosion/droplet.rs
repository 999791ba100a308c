//! A single simulated water particle and the
//! bilinear sampling it needs from the padded heightmap.

use crate::{compositor::RawHeightmap, geometry::Vec2};

/// Transient simulation state for one droplet. Lifetime is bounded by
/// `max_lifetime` iterations; created at simulator entry, destroyed at exit
/// or when it leaves the padded region.
#[derive(Copy, Clone, Debug)]
pub struct Droplet {
    pub pos: Vec2,
    pub dir: Vec2,
    pub speed: f32,
    pub water: f32,
    pub sediment: f32,
}

impl Droplet {
    pub fn spawn(pos: Vec2, start_speed: f32, start_water: f32) -> Self {
        Self {
            pos,
            dir: Vec2::zeros(),
            speed: start_speed,
            water: start_water,
            sediment: 0.0,
        }
    }
}

/// A droplet spawn candidate before it's known whether it falls inside the
/// search region: its world-space position and precomputed order key.
#[derive(Copy, Clone, Debug)]
pub struct DropletCandidate {
    pub world_pos: (f64, f64),
    pub order_key: u32,
}

/// Bilinearly sample the height at a fractional padded-local position.
pub fn sample_height(map: &RawHeightmap, pos: Vec2) -> f32 {
    let (x0, y0, tx, ty) = bilinear_corners(map, pos);
    let x1 = (x0 + 1).min(map.size - 1);
    let y1 = (y0 + 1).min(map.size - 1);

    let h00 = map.get(x0, y0);
    let h10 = map.get(x1, y0);
    let h01 = map.get(x0, y1);
    let h11 = map.get(x1, y1);

    let top = h00 * (1.0 - tx) + h10 * tx;
    let bottom = h01 * (1.0 - tx) + h11 * tx;
    top * (1.0 - ty) + bottom * ty
}

/// Bilinearly sample the height gradient `(dH/dx, dH/dy)` at a fractional
/// padded-local position, via the finite differences of the same four
/// corners used for height sampling.
pub fn sample_gradient(map: &RawHeightmap, pos: Vec2) -> Vec2 {
    let (x0, y0, tx, ty) = bilinear_corners(map, pos);
    let x1 = (x0 + 1).min(map.size - 1);
    let y1 = (y0 + 1).min(map.size - 1);

    let h00 = map.get(x0, y0);
    let h10 = map.get(x1, y0);
    let h01 = map.get(x0, y1);
    let h11 = map.get(x1, y1);

    let gx = (h10 - h00) * (1.0 - ty) + (h11 - h01) * ty;
    let gy = (h01 - h00) * (1.0 - tx) + (h11 - h10) * tx;
    Vec2::new(gx, gy)
}

fn bilinear_corners(map: &RawHeightmap, pos: Vec2) -> (u32, u32, f32, f32) {
    let cx = pos.x.clamp(0.0, (map.size - 1) as f32);
    let cy = pos.y.clamp(0.0, (map.size - 1) as f32);
    let x0 = cx.floor() as u32;
    let y0 = cy.floor() as u32;
    (x0, y0, cx - x0 as f32, cy - y0 as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_sample_height_at_grid_point() {
        let mut map = RawHeightmap::filled(4, 0.0);
        map.set(1, 1, 5.0);
        assert_eq!(sample_height(&map, Vec2::new(1.0, 1.0)), 5.0);
    }

    #[test]
    fn test_sample_height_interpolates() {
        let mut map = RawHeightmap::filled(2, 0.0);
        map.set(0, 0, 0.0);
        map.set(1, 0, 10.0);
        map.set(0, 1, 0.0);
        map.set(1, 1, 10.0);
        let h = sample_height(&map, Vec2::new(0.5, 0.0));
        assert_approx_eq!(h, 5.0, 1e-5);
    }

    #[test]
    fn test_gradient_flat_is_zero() {
        let map = RawHeightmap::filled(4, 2.0);
        let g = sample_gradient(&map, Vec2::new(1.5, 1.5));
        assert_eq!(g, Vec2::zeros());
    }
}
