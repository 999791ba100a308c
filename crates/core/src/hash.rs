//! Deterministic integer hashing, uniform float derivation, and simplex
//! noise. Every function here is pure and referentially transparent: the
//! same inputs always produce the same outputs, regardless of call order,
//! thread, or platform. This is the bedrock the rest of the crate leans on
//! to guarantee seamlessness — a pixel's height must never depend on which
//! tile asked for it, only on its own world coordinates.

/// Hash a 2D lattice cell into a 32-bit value. The mixing constants are
/// fixed so that other implementations of this spec agree bit-for-bit.
///
/// ```
/// use fluvion::hash::hash2;
/// assert_eq!(hash2(0, 0, 0), 0);
/// assert_eq!(hash2(1, 0, 0), 0x1657_3971);
/// ```
pub fn hash2(x: i32, y: i32, seed: u32) -> u32 {
    let mut h = seed;
    h ^= (x as u32).wrapping_mul(0x1657_3971);
    h ^= (y as u32).wrapping_mul(0x27D4_EB2F);
    h ^= h >> 13;
    h = h.wrapping_mul(0x4BF9_D121);
    h ^= h >> 16;
    h
}

/// Derive a uniform float in `[0, 1)` from a seed and an index. Used
/// anywhere we need a reproducible stream of "random" values keyed off a
/// deterministic position rather than off RNG call order.
pub fn rand_f32(seed: u32, index: u32) -> f32 {
    let mut h = seed ^ index.wrapping_mul(0x2C92_77B5);
    h = ((h >> 16) ^ h).wrapping_mul(0x045D_9F3B);
    h = ((h >> 16) ^ h).wrapping_mul(0x045D_9F3B);
    h = (h >> 16) ^ h;
    (h as f64 / 2f64.powi(32)) as f32
}

/// 8-way gradient table for 2D simplex noise, indexed by `hash2(...) % 8`.
const GRADIENTS: [(f32, f32); 8] = [
    (1.0, 0.0),
    (-1.0, 0.0),
    (0.0, 1.0),
    (0.0, -1.0),
    (std::f32::consts::FRAC_1_SQRT_2, std::f32::consts::FRAC_1_SQRT_2),
    (std::f32::consts::FRAC_1_SQRT_2, -std::f32::consts::FRAC_1_SQRT_2),
    (-std::f32::consts::FRAC_1_SQRT_2, std::f32::consts::FRAC_1_SQRT_2),
    (-std::f32::consts::FRAC_1_SQRT_2, -std::f32::consts::FRAC_1_SQRT_2),
];

fn gradient_at(ix: i32, iy: i32, seed: i32) -> (f32, f32) {
    let idx = (hash2(ix, iy, seed as u32) & 0x7) as usize;
    GRADIENTS[idx]
}

fn dot(grad: (f32, f32), dx: f32, dy: f32) -> f32 {
    grad.0 * dx + grad.1 * dy
}

const SKEW: f32 = 0.366_025_4; // (sqrt(3) - 1) / 2
const UNSKEW: f32 = 0.211_324_87; // (3 - sqrt(3)) / 6

/// Classical 2D simplex noise, returning a value in `[-1, 1]`. Gradients are
/// selected via [`hash2`] of the containing simplex's lattice corners, so
/// two evaluations at the same world coordinates always agree regardless of
/// which tile's generation pass is asking.
pub fn simplex2(x: f32, y: f32, seed: i32) -> f32 {
    let skew = (x + y) * SKEW;
    let i = (x + skew).floor();
    let j = (y + skew).floor();

    let unskew = (i + j) * UNSKEW;
    let x0_origin = i - unskew;
    let y0_origin = j - unskew;
    let x0 = x - x0_origin;
    let y0 = y - y0_origin;

    let (i1, j1) = if x0 > y0 { (1.0, 0.0) } else { (0.0, 1.0) };

    let x1 = x0 - i1 + UNSKEW;
    let y1 = y0 - j1 + UNSKEW;
    let x2 = x0 - 1.0 + 2.0 * UNSKEW;
    let y2 = y0 - 1.0 + 2.0 * UNSKEW;

    let ii = i as i32;
    let jj = j as i32;

    let corner = |cx: f32, cy: f32, ci: i32, cj: i32| -> f32 {
        let t = 0.5 - cx * cx - cy * cy;
        if t < 0.0 {
            0.0
        } else {
            let t2 = t * t;
            t2 * t2 * dot(gradient_at(ci, cj, seed), cx, cy)
        }
    };

    let n0 = corner(x0, y0, ii, jj);
    let n1 = corner(x1, y1, ii + i1 as i32, jj + j1 as i32);
    let n2 = corner(x2, y2, ii + 1, jj + 1);

    // Scaling factor puts the result in roughly [-1, 1].
    70.0 * (n0 + n1 + n2)
}

/// Fractal Brownian motion: an octave sum of [`simplex2`] at geometrically
/// increasing frequencies, normalized by the total amplitude so the result
/// stays within `[-1, 1]`.
#[allow(clippy::too_many_arguments)]
pub fn fbm(
    x: f32,
    y: f32,
    seed: i32,
    freq: f32,
    octaves: u8,
    lacunarity: f32,
    persistence: f32,
) -> f32 {
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = freq;
    let mut max_amplitude = 0.0;

    for octave in 0..octaves {
        // Offset the seed per octave so octaves aren't correlated copies of
        // each other at different scales.
        let octave_seed = seed.wrapping_add(octave as i32 * 1013);
        total += simplex2(x * frequency, y * frequency, octave_seed) * amplitude;
        max_amplitude += amplitude;
        amplitude *= persistence;
        frequency *= lacunarity;
    }

    if max_amplitude > 0.0 {
        total / max_amplitude
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash2_reference_constants() {
        // Cross-implementation agreement anchors, per spec.
        assert_eq!(hash2(0, 0, 0), 0);
        assert_eq!(hash2(1, 0, 0), 0x1657_3971);
    }

    #[test]
    fn test_hash2_deterministic() {
        let a = hash2(42, -17, 999);
        let b = hash2(42, -17, 999);
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash2_position_sensitive() {
        assert_ne!(hash2(1, 2, 0), hash2(2, 1, 0));
    }

    #[test]
    fn test_rand_f32_range() {
        for i in 0..1000 {
            let v = rand_f32(12345, i);
            assert!((0.0..1.0).contains(&v), "{v} out of range");
        }
    }

    #[test]
    fn test_rand_f32_deterministic() {
        assert_eq!(rand_f32(0, 0), rand_f32(0, 0));
    }

    #[test]
    fn test_simplex2_bounded() {
        for i in 0..200 {
            let x = i as f32 * 0.13;
            let y = i as f32 * 0.07;
            let v = simplex2(x, y, 7);
            assert!((-1.0..=1.0).contains(&v), "{v} out of range at ({x},{y})");
        }
    }

    #[test]
    fn test_simplex2_deterministic() {
        assert_eq!(simplex2(1.5, -2.25, 3), simplex2(1.5, -2.25, 3));
    }

    #[test]
    fn test_fbm_normalized() {
        for i in 0..50 {
            let x = i as f32 * 0.37;
            let v = fbm(x, -x, 7, 0.25, 4, 2.0, 0.5);
            assert!((-1.0..=1.0).contains(&v));
        }
    }
}
