//! Perlin (gradient) fractal noise over a tileable square.

use std::f32::consts::{FRAC_1_SQRT_2, TAU};

use glam::Vec2;
use volken_core::math::smoother_lerp;

use crate::field::NoisePlane;
use crate::rng::SeededSequence;
use crate::synthesizer::FractalParams;

pub(crate) fn generate(seed: u32, params: &FractalParams) -> NoisePlane {
    let mut data = fractal_sum(seed, params);
    for v in &mut data {
        *v = v.clamp(0.0, 1.0);
    }
    NoisePlane::new(params.resolution, params.resolution, data)
}

/// Weighted octave sum before the final clamp.
fn fractal_sum(seed: u32, params: &FractalParams) -> Vec<f32> {
    let res = params.resolution;
    let mut data = vec![0.0f32; (res as usize).pow(2)];

    for octave in 0..params.octaves {
        let cells = params.octave_cells(octave);
        if cells > res {
            log::debug!("gradient octave {octave}: {cells} cells exceed resolution {res}, stopping");
            break;
        }
        accumulate_octave(&mut data, res, cells, params.octave_weight(octave), seed);
    }
    data
}

fn gradients(seed: u32, cells: u32) -> Vec<Vec2> {
    let mut seq = SeededSequence::new(seed);
    (0..(cells as usize).pow(2))
        .map(|_| Vec2::from_angle(seq.next_unit() * TAU))
        .collect()
}

/// Signed Perlin value in `[-√2/2, √2/2]` at `p` (cell units), wrapping
/// every `cells` cells.
fn perlin(p: Vec2, cells: u32, grads: &[Vec2]) -> f32 {
    let c = cells as i32;
    let base = p.floor();
    let f = p - base;
    let (bx, by) = (base.x as i32, base.y as i32);

    let corner = |dx: i32, dy: i32| {
        let gx = (bx + dx).rem_euclid(c) as usize;
        let gy = (by + dy).rem_euclid(c) as usize;
        let g = grads[gx + gy * cells as usize];
        g.dot(f - Vec2::new(dx as f32, dy as f32))
    };

    let top = smoother_lerp(corner(0, 0), corner(1, 0), f.x);
    let bottom = smoother_lerp(corner(0, 1), corner(1, 1), f.x);
    smoother_lerp(top, bottom, f.y)
}

fn accumulate_octave(data: &mut [f32], res: u32, cells: u32, weight: f32, seed: u32) {
    let grads = gradients(seed, cells);
    let cell_size = res as f32 / cells as f32;
    let r = res as usize;

    for y in 0..r {
        for x in 0..r {
            let p = Vec2::new(x as f32, y as f32) / cell_size;
            let n = perlin(p, cells, &grads);
            data[x + y * r] += weight * (0.5 + n * FRAC_1_SQRT_2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lattice_points_are_zero() {
        let grads = gradients(1, 4);
        for y in 0..4 {
            for x in 0..4 {
                let n = perlin(Vec2::new(x as f32, y as f32), 4, &grads);
                assert!(n.abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_range_and_determinism() {
        let params = FractalParams::new(48, 3, 4, 0.5, 2.0);
        let a = generate(77, &params);
        assert_eq!(a, generate(77, &params));
        for v in fractal_sum(77, &params) {
            assert!((-1e-6..=1.0 + 1e-6).contains(&v), "sum {v} out of range");
        }
        let (lo, hi) = a.min_max();
        assert!(hi - lo > 0.05, "field should not be flat");
        assert!((a.mean() - 0.5).abs() < 0.15, "mean {}", a.mean());
    }

    #[test]
    fn test_non_divisible_cell_size_tiles() {
        // 50 / 3 cells is not an integer cell size
        let plane = generate(4, &FractalParams::new(50, 3, 1, 0.5, 2.0));
        for y in 0..50 {
            let across = (plane.texel(49, y) - plane.texel(0, y)).abs();
            assert!(across < 0.2, "seam at y={y}: {across}");
        }
    }
}
