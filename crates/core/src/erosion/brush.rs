//! The small weighted neighborhood a droplet spreads its eroded mass across,
//! avoiding single-pixel spikes.

use crate::compositor::RawHeightmap;
use crate::geometry::Vec2;

/// Seam between the droplet simulation loop in `erosion::mod` and whatever
/// scheme distributes a droplet's erosion across the padded buffer. [`Brush`]
/// is the only kernel this crate ships, but an alternative (a kernel that
/// samples a 2D intensity texture instead of a fixed weighted neighborhood,
/// say) can implement this trait and drop into
/// [`ErosionSimulator::with_kernel`](super::ErosionSimulator::with_kernel)
/// without the driver loop changing at all.
pub trait ErosionKernel: Clone + std::fmt::Debug {
    /// Remove `amount` of height from the buffer, distributed around `pos`
    /// however this kernel weights its footprint. Implementations must
    /// conserve `amount`: the total height removed should equal `amount`
    /// exactly, since callers rely on it to balance a droplet's sediment.
    fn erode(&self, map: &mut RawHeightmap, pos: Vec2, amount: f32);

    /// Radius of this kernel's footprint in padded-buffer pixels, used to
    /// keep droplets far enough from the padded border that the footprint
    /// never reads outside the buffer.
    fn radius(&self) -> u32;
}

/// A brush entry: a 1D-flattened pixel offset into the padded buffer, paired
/// with a weight in `[0, 1]`. Weights across a brush always sum to 1.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BrushEntry {
    pub dx: i32,
    pub dy: i32,
    pub weight: f32,
}

/// A fixed neighborhood of [`BrushEntry`] values, built once per
/// `brush_radius` and reused for every droplet step (droplets never build
/// their own brush).
#[derive(Clone, Debug)]
pub struct Brush {
    entries: Vec<BrushEntry>,
    pub radius: u32,
}

impl Brush {
    /// Build the default brush: every pixel within Chebyshev distance
    /// `radius` of the center, weighted by `max(0, 1 - d/1.5)` and
    /// normalized to sum to 1.
    pub fn new(radius: u32) -> Self {
        let r = radius as i32;
        let mut entries = Vec::new();
        let mut total = 0.0;
        for dy in -r..=r {
            for dx in -r..=r {
                let d = ((dx * dx + dy * dy) as f32).sqrt();
                let w = (1.0 - d / 1.5).max(0.0);
                if w > 0.0 {
                    total += w;
                    entries.push(BrushEntry { dx, dy, weight: w });
                }
            }
        }
        if total > 0.0 {
            for entry in &mut entries {
                entry.weight /= total;
            }
        }
        Self { entries, radius }
    }

    pub fn entries(&self) -> &[BrushEntry] {
        &self.entries
    }
}

impl ErosionKernel for Brush {
    fn erode(&self, map: &mut RawHeightmap, pos: Vec2, amount: f32) {
        for entry in &self.entries {
            let x = (pos.x.floor() as i32 + entry.dx) as u32;
            let y = (pos.y.floor() as i32 + entry.dy) as u32;
            map.set(x, y, map.get(x, y) - amount * entry.weight);
        }
    }

    fn radius(&self) -> u32 {
        self.radius
    }
}
