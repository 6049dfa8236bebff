//! Worley (cellular) fractal noise over a tileable cube.

use glam::{IVec3, Vec3};

use crate::field::NoiseVolume;
use crate::rng::SeededSequence;
use crate::synthesizer::FractalParams;

pub(crate) fn generate(seed: u32, params: &FractalParams) -> NoiseVolume {
    let mut data = fractal_sum(seed, params);
    // weight rounding can overshoot 1 by an ulp
    for v in &mut data {
        *v = v.clamp(0.0, 1.0);
    }
    NoiseVolume::new(params.resolution, data)
}

/// Weighted octave sum before the final clamp.
fn fractal_sum(seed: u32, params: &FractalParams) -> Vec<f32> {
    let res = params.resolution;
    let mut data = vec![0.0f32; (res as usize).pow(3)];

    for octave in 0..params.octaves {
        let cells = params.octave_cells(octave);
        if cells > res {
            // Remaining weights are dropped, not redistributed.
            log::debug!(
                "cellular octave {octave}: {cells} cells exceed resolution {res}, stopping"
            );
            break;
        }
        accumulate_octave(&mut data, res, cells, params.octave_weight(octave), seed);
    }
    data
}

/// One feature point per cell, as an offset inside the cell in [0, 1)³.
/// The sequence restarts from the seed so every octave uses the same stream.
fn feature_points(seed: u32, cells: u32) -> Vec<Vec3> {
    let mut seq = SeededSequence::new(seed);
    (0..(cells as usize).pow(3))
        .map(|_| Vec3::new(seq.next_unit(), seq.next_unit(), seq.next_unit()))
        .collect()
}

fn accumulate_octave(data: &mut [f32], res: u32, cells: u32, weight: f32, seed: u32) {
    let points = feature_points(seed, cells);
    let cells_i = cells as i32;
    let cell_size = res as f32 / cells as f32;
    let r = res as usize;
    let c = cells as usize;

    for z in 0..r {
        for y in 0..r {
            for x in 0..r {
                // voxel centre in cell units
                let p = (Vec3::new(x as f32, y as f32, z as f32) + Vec3::splat(0.5)) / cell_size;
                let base = p.floor().as_ivec3();

                let mut nearest = f32::MAX;
                for dz in -1..=1 {
                    for dy in -1..=1 {
                        for dx in -1..=1 {
                            let cell = base + IVec3::new(dx, dy, dz);
                            let w = IVec3::new(
                                cell.x.rem_euclid(cells_i),
                                cell.y.rem_euclid(cells_i),
                                cell.z.rem_euclid(cells_i),
                            );
                            let idx = w.x as usize + w.y as usize * c + w.z as usize * c * c;
                            let feature = cell.as_vec3() + points[idx];
                            nearest = nearest.min(feature.distance_squared(p));
                        }
                    }
                }

                // distance is already in cell units
                let value = 1.0 - nearest.sqrt().min(1.0);
                data[x + y * r + z * r * r] += weight * value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(res: u32, base: u32, octaves: u32) -> FractalParams {
        FractalParams::new(res, base, octaves, 0.5, 2.0)
    }

    fn assert_unit_range(data: &[f32]) {
        for &v in data {
            assert!((-1e-6..=1.0 + 1e-6).contains(&v), "sum {v} out of range");
        }
    }

    #[test]
    fn test_single_octave_scenario() {
        assert_unit_range(&fractal_sum(0, &params(64, 4, 1)));
        let vol = generate(0, &params(64, 4, 1));
        assert_eq!(vol.data().len(), 64 * 64 * 64);
        let (_, hi) = vol.min_max();
        assert!(hi > 0.8, "some voxels should sit near a feature point");
        let mean = vol.mean();
        assert!(mean > 0.3 && mean < 0.75, "mean {mean}");
    }

    #[test]
    fn test_fractal_range_and_determinism() {
        let a = generate(42, &params(24, 3, 3));
        let b = generate(42, &params(24, 3, 3));
        assert_eq!(a, b);
        assert_unit_range(&fractal_sum(42, &params(24, 3, 3)));
        for gain in [0.2, 0.9, 1.6] {
            let p = FractalParams::new(24, 2, 3, gain, 2.0);
            assert_unit_range(&fractal_sum(7, &p));
        }

        let c = generate(43, &params(24, 3, 3));
        assert_ne!(a, c);
    }

    #[test]
    fn test_tiles_across_boundary() {
        let vol = generate(9, &params(16, 2, 1));
        // neighbouring voxels across the wrap differ no more than interior neighbours can
        for y in 0..16 {
            let across = (vol.texel(15, y, 3) - vol.texel(0, y, 3)).abs();
            assert!(across < 0.5, "discontinuity at y={y}: {across}");
        }
    }

    #[test]
    fn test_early_exit_keeps_partial_sum() {
        // second octave has 8 cells > resolution 6, so only octave 0 lands
        let full = generate(5, &params(6, 4, 1));
        let cut = generate(5, &params(6, 4, 2));
        let w0 = params(6, 4, 2).octave_weight(0);
        for (f, c) in full.data().iter().zip(cut.data()) {
            assert!((f * w0 - c).abs() < 1e-5);
        }
    }
}
