use std::time::Instant;

use volken_core::constants::DEFAULT_NOISE_SEED;

use crate::field::{NoisePlane, NoiseVolume, PlanetSurfaceMap};
use crate::{cellular, gradient, planet, NoiseError};

/// Parameters of one tileable fractal field. `base` is the cell count of
/// the first octave.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FractalParams {
    pub resolution: u32,
    pub base: u32,
    pub octaves: u32,
    pub gain: f32,
    pub lacunarity: f32,
}

impl FractalParams {
    pub const fn new(resolution: u32, base: u32, octaves: u32, gain: f32, lacunarity: f32) -> Self {
        Self {
            resolution,
            base,
            octaves,
            gain,
            lacunarity,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), NoiseError> {
        let invalid = |msg: String| Err(NoiseError::InvalidArgument(msg));
        if self.resolution == 0 {
            return invalid("resolution must be at least 1".into());
        }
        if self.base == 0 {
            return invalid("base cell count must be at least 1".into());
        }
        check_octaves(self.octaves, self.gain, self.lacunarity)
    }

    /// Normaliser making the full set of octave weights sum to 1.
    pub(crate) fn octave_norm(&self) -> f32 {
        let total = 1.0 - self.gain.powi(self.octaves as i32);
        if (1.0 - self.gain).abs() < 1e-6 || total.abs() < 1e-6 {
            1.0 / self.octaves as f32
        } else {
            (1.0 - self.gain) / total
        }
    }

    pub(crate) fn octave_weight(&self, octave: u32) -> f32 {
        self.octave_norm() * self.gain.powi(octave as i32)
    }

    /// Cell count of an octave: `round(base · lacunarity^octave)`.
    pub(crate) fn octave_cells(&self, octave: u32) -> u32 {
        (self.base as f32 * self.lacunarity.powi(octave as i32)).round() as u32
    }
}

fn check_octaves(octaves: u32, gain: f32, lacunarity: f32) -> Result<(), NoiseError> {
    let invalid = |msg: String| Err(NoiseError::InvalidArgument(msg));
    if octaves == 0 {
        return invalid("octave count must be at least 1".into());
    }
    if !gain.is_finite() || gain <= 0.0 {
        return invalid(format!("gain must be positive, got {gain}"));
    }
    if !lacunarity.is_finite() || lacunarity < 1.0 {
        return invalid(format!("lacunarity must be >= 1, got {lacunarity}"));
    }
    Ok(())
}

/// Parameters of the planet surface map. `frequency` is the sampling
/// frequency of the first octave on the unit sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanetMapParams {
    pub resolution: u32,
    pub frequency: f32,
    pub octaves: u32,
    pub gain: f32,
    pub lacunarity: f32,
}

impl PlanetMapParams {
    pub const fn new(
        resolution: u32,
        frequency: f32,
        octaves: u32,
        gain: f32,
        lacunarity: f32,
    ) -> Self {
        Self {
            resolution,
            frequency,
            octaves,
            gain,
            lacunarity,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), NoiseError> {
        if self.resolution == 0 {
            return Err(NoiseError::InvalidArgument(
                "resolution must be at least 1".into(),
            ));
        }
        if !self.frequency.is_finite() || self.frequency <= 0.0 {
            return Err(NoiseError::InvalidArgument(format!(
                "frequency must be positive, got {}",
                self.frequency
            )));
        }
        check_octaves(self.octaves, self.gain, self.lacunarity)
    }
}

/// Per-texture generation parameters for a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseSettings {
    pub shape: FractalParams,
    pub detail: FractalParams,
    pub planet_map: PlanetMapParams,
    pub blue_noise: FractalParams,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            shape: FractalParams::new(128, 4, 4, 0.5, 2.0),
            detail: FractalParams::new(128, 8, 4, 0.5, 2.0),
            planet_map: PlanetMapParams::new(2048, 16.0, 6, 0.5, 2.0),
            blue_noise: FractalParams::new(64, 8, 3, 0.5, 2.0),
        }
    }
}

impl NoiseSettings {
    /// Small textures for tests and headless runs.
    pub fn preview() -> Self {
        Self {
            shape: FractalParams::new(32, 4, 3, 0.5, 2.0),
            detail: FractalParams::new(16, 4, 2, 0.5, 2.0),
            planet_map: PlanetMapParams::new(64, 8.0, 4, 0.5, 2.0),
            blue_noise: FractalParams::new(32, 8, 2, 0.5, 2.0),
        }
    }
}

/// Seeded noise generator. Cheap to construct; holds only the seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoiseSynthesizer {
    seed: u32,
}

impl Default for NoiseSynthesizer {
    fn default() -> Self {
        Self::new(DEFAULT_NOISE_SEED)
    }
}

impl NoiseSynthesizer {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Tileable Worley fBm volume in [0, 1]. Higher means closer to a
    /// feature point.
    pub fn cellular_fractal_3d(
        &self,
        resolution: u32,
        base_cell_count: u32,
        octave_count: u32,
        gain: f32,
        lacunarity: f32,
    ) -> Result<NoiseVolume, NoiseError> {
        let params = FractalParams::new(resolution, base_cell_count, octave_count, gain, lacunarity);
        params.validate()?;
        Ok(cellular::generate(self.seed, &params))
    }

    /// Tileable Perlin fBm plane of side `resolution`, values in [0, 1].
    pub fn gradient_fractal_2d(
        &self,
        resolution: u32,
        base_cell_count: u32,
        octave_count: u32,
        gain: f32,
        lacunarity: f32,
    ) -> Result<NoisePlane, NoiseError> {
        let params = FractalParams::new(resolution, base_cell_count, octave_count, gain, lacunarity);
        params.validate()?;
        Ok(gradient::generate(self.seed, &params))
    }

    /// Equirectangular `2·resolution × resolution` coverage map from value
    /// noise sampled on the unit sphere.
    pub fn planet_surface_map(
        &self,
        resolution: u32,
        frequency: f32,
        octave_count: u32,
        gain: f32,
        lacunarity: f32,
    ) -> Result<PlanetSurfaceMap, NoiseError> {
        let params = PlanetMapParams::new(resolution, frequency, octave_count, gain, lacunarity);
        params.validate()?;
        Ok(planet::generate(self.seed, &params))
    }
}

/// The noise inputs of the cloud pipeline, generated together.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudNoiseSet {
    pub shape: NoiseVolume,
    pub detail: NoiseVolume,
    pub planet_map: PlanetSurfaceMap,
    pub blue_noise: NoisePlane,
}

impl CloudNoiseSet {
    pub fn generate(
        synth: &NoiseSynthesizer,
        settings: &NoiseSettings,
    ) -> Result<Self, NoiseError> {
        let start = Instant::now();
        let call3 = |p: &FractalParams| {
            synth.cellular_fractal_3d(p.resolution, p.base, p.octaves, p.gain, p.lacunarity)
        };
        let shape = call3(&settings.shape)?;
        let detail = call3(&settings.detail)?;

        let p = &settings.planet_map;
        let planet_map =
            synth.planet_surface_map(p.resolution, p.frequency, p.octaves, p.gain, p.lacunarity)?;

        let p = &settings.blue_noise;
        let blue_noise =
            synth.gradient_fractal_2d(p.resolution, p.base, p.octaves, p.gain, p.lacunarity)?;

        log::info!(
            "Generated cloud noise (seed {}): shape {}³, detail {}³, planet map {}x{}, blue noise {}² in {:.1} ms",
            synth.seed(),
            shape.resolution(),
            detail.resolution(),
            planet_map.width(),
            planet_map.resolution(),
            blue_noise.width(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(Self {
            shape,
            detail,
            planet_map,
            blue_noise,
        })
    }
}
