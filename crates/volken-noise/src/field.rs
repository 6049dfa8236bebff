//! Generated noise fields. Immutable once built; all sampling wraps.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};

fn wrap_index(i: i64, n: u32) -> usize {
    i.rem_euclid(i64::from(n)) as usize
}

/// Cubic scalar volume of side `resolution`, x-fastest layout.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseVolume {
    resolution: u32,
    data: Vec<f32>,
}

impl NoiseVolume {
    pub(crate) fn new(resolution: u32, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), (resolution as usize).pow(3));
        Self { resolution, data }
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn texel(&self, x: i64, y: i64, z: i64) -> f32 {
        let n = self.resolution;
        let r = n as usize;
        self.data[wrap_index(x, n) + wrap_index(y, n) * r + wrap_index(z, n) * r * r]
    }

    /// Trilinear sample at texture coordinates; one unit spans the volume.
    pub fn sample_trilinear(&self, uvw: Vec3) -> f32 {
        let p = uvw * self.resolution as f32 - Vec3::splat(0.5);
        let base = p.floor();
        let f = p - base;
        let (x, y, z) = (base.x as i64, base.y as i64, base.z as i64);

        let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;
        let plane = |z: i64| {
            let a = lerp(self.texel(x, y, z), self.texel(x + 1, y, z), f.x);
            let b = lerp(self.texel(x, y + 1, z), self.texel(x + 1, y + 1, z), f.x);
            lerp(a, b, f.y)
        };
        lerp(plane(z), plane(z + 1), f.z)
    }

    pub fn mean(&self) -> f32 {
        mean(&self.data)
    }

    pub fn min_max(&self) -> (f32, f32) {
        min_max(&self.data)
    }
}

/// Rectangular scalar plane, x-fastest layout.
#[derive(Debug, Clone, PartialEq)]
pub struct NoisePlane {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl NoisePlane {
    pub(crate) fn new(width: u32, height: u32, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn texel(&self, x: i64, y: i64) -> f32 {
        self.data[wrap_index(x, self.width) + wrap_index(y, self.height) * self.width as usize]
    }

    /// Bilinear sample at texture coordinates; one unit spans the plane.
    pub fn sample_bilinear(&self, uv: Vec2) -> f32 {
        let p = uv * Vec2::new(self.width as f32, self.height as f32) - Vec2::splat(0.5);
        let base = p.floor();
        let f = p - base;
        let (x, y) = (base.x as i64, base.y as i64);
        let top = self.texel(x, y) + (self.texel(x + 1, y) - self.texel(x, y)) * f.x;
        let bottom =
            self.texel(x, y + 1) + (self.texel(x + 1, y + 1) - self.texel(x, y + 1)) * f.x;
        top + (bottom - top) * f.y
    }

    pub fn mean(&self) -> f32 {
        mean(&self.data)
    }

    pub fn min_max(&self) -> (f32, f32) {
        min_max(&self.data)
    }
}

/// Equirectangular planet coverage map: `2·res × res` texels with a density
/// and a height channel.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanetSurfaceMap {
    resolution: u32,
    density: Vec<f32>,
    height: Vec<f32>,
}

impl PlanetSurfaceMap {
    pub(crate) fn new(resolution: u32, density: Vec<f32>, height: Vec<f32>) -> Self {
        debug_assert_eq!(density.len(), 2 * (resolution as usize).pow(2));
        debug_assert_eq!(height.len(), density.len());
        Self {
            resolution,
            density,
            height,
        }
    }

    /// Rows of the map; the map is twice as wide.
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn width(&self) -> u32 {
        self.resolution * 2
    }

    pub fn density(&self) -> &[f32] {
        &self.density
    }

    pub fn height(&self) -> &[f32] {
        &self.height
    }

    /// Interleaved (density, height) pairs, the layout of the RG texture.
    pub fn interleaved(&self) -> Vec<[f32; 2]> {
        self.density
            .iter()
            .zip(&self.height)
            .map(|(&d, &h)| [d, h])
            .collect()
    }

    fn index(&self, x: i64, y: i64) -> usize {
        let y = y.clamp(0, i64::from(self.resolution) - 1) as usize;
        wrap_index(x, self.width()) + y * self.width() as usize
    }

    /// Bilinear (density, height) for a direction from the planet centre.
    /// Longitude wraps; latitude clamps at the poles.
    pub fn sample(&self, direction: Vec3) -> (f32, f32) {
        let dir = direction.normalize_or_zero();
        if dir == Vec3::ZERO {
            return (self.density[0], self.height[0]);
        }
        let lat = dir.y.clamp(-1.0, 1.0).asin();
        let lon = dir.z.atan2(dir.x);

        let res = self.resolution as f32;
        // texel (x, y) was generated at exactly this longitude/latitude
        let px = lon / PI * res;
        let py = (lat / PI + 0.5) * res;
        let (x0, y0) = (px.floor(), py.floor());
        let (fx, fy) = (px - x0, py - y0);
        let (x, y) = (x0 as i64, y0 as i64);

        let bilinear = |channel: &[f32]| {
            let t = channel[self.index(x, y)]
                + (channel[self.index(x + 1, y)] - channel[self.index(x, y)]) * fx;
            let b = channel[self.index(x, y + 1)]
                + (channel[self.index(x + 1, y + 1)] - channel[self.index(x, y + 1)]) * fx;
            t + (b - t) * fy
        };
        (bilinear(&self.density), bilinear(&self.height))
    }
}

fn mean(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    (data.iter().map(|&v| f64::from(v)).sum::<f64>() / data.len() as f64) as f32
}

fn min_max(data: &[f32]) -> (f32, f32) {
    data.iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}
