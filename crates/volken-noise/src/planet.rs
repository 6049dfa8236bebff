//! Planet-scale coverage map: value-noise fBm on the unit sphere, stored
//! equirectangular.

use std::f32::consts::PI;

use glam::Vec3;
use volken_core::math::quintic;

use crate::field::PlanetSurfaceMap;
use crate::rng::{hash_to_unit, noise_hash};
use crate::synthesizer::PlanetMapParams;

/// Salt separating the height channel's lattice from the density channel's.
const HEIGHT_SEED_SALT: u32 = 0x68E3_1DA4;

/// Height detail runs at this multiple of the density frequency.
const HEIGHT_FREQUENCY_SCALE: f32 = 4.0;

/// Value noise in [-1, 1] on the integer lattice.
fn value_noise(seed: u32, p: Vec3) -> f32 {
    let base = p.floor();
    let f = p - base;
    let u = Vec3::new(quintic(f.x), quintic(f.y), quintic(f.z));
    let (x, y, z) = (base.x as i32, base.y as i32, base.z as i32);

    let v = |dx: i32, dy: i32, dz: i32| {
        hash_to_unit(noise_hash(x + dx, y + dy, z + dz, seed)) * 2.0 - 1.0
    };
    let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;

    let x00 = lerp(v(0, 0, 0), v(1, 0, 0), u.x);
    let x10 = lerp(v(0, 1, 0), v(1, 1, 0), u.x);
    let x01 = lerp(v(0, 0, 1), v(1, 0, 1), u.x);
    let x11 = lerp(v(0, 1, 1), v(1, 1, 1), u.x);
    lerp(lerp(x00, x10, u.y), lerp(x01, x11, u.y), u.z)
}

/// Normalised fBm in [-1, 1]. Each octave gets its own lattice seed.
fn fbm(seed: u32, p: Vec3, frequency: f32, octaves: u32, gain: f32, lacunarity: f32) -> f32 {
    let mut sum = 0.0;
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut freq = frequency;
    for octave in 0..octaves {
        sum += amplitude * value_noise(seed.wrapping_add(octave), p * freq);
        total += amplitude;
        amplitude *= gain;
        freq *= lacunarity;
    }
    sum / total
}

/// Unit-sphere point for map pixel `(x, y)` of a `2·res × res` grid.
pub(crate) fn pixel_direction(x: u32, y: u32, res: u32) -> Vec3 {
    let lat = (y as f32 / res as f32 - 0.5) * PI;
    let lon = x as f32 / res as f32 * PI;
    Vec3::new(lon.cos() * lat.cos(), lat.sin(), lon.sin() * lat.cos())
}

pub(crate) fn generate(seed: u32, params: &PlanetMapParams) -> PlanetSurfaceMap {
    let res = params.resolution;
    let width = res * 2;
    let len = width as usize * res as usize;
    let mut density = Vec::with_capacity(len);
    let mut height = Vec::with_capacity(len);

    let frequency = params.frequency;
    let height_octaves = (params.octaves / 2).max(1);
    let height_seed = seed ^ HEIGHT_SEED_SALT;

    for y in 0..res {
        for x in 0..width {
            let p = pixel_direction(x, y, res);
            let d = fbm(seed, p, frequency, params.octaves, params.gain, params.lacunarity);
            let h = fbm(
                height_seed,
                p,
                frequency * HEIGHT_FREQUENCY_SCALE,
                height_octaves,
                params.gain,
                params.lacunarity,
            );
            density.push((0.5 + 0.5 * d).clamp(0.0, 1.0));
            height.push((0.5 + 0.5 * h).clamp(0.0, 1.0));
        }
    }

    PlanetSurfaceMap::new(res, density, height)
}
