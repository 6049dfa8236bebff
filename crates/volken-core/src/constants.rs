//! Single source of truth for shared constants.
//! Values that mirror shader-side unit conversions live here so the CPU
//! passes and the uniform block agree.

/// Largest accepted cloud buffer scale (native resolution). Also used when
/// the configured scale is not a positive finite number.
pub const MAX_RESOLUTION_SCALE: f32 = 1.0;

/// Lower bound for light samples marched toward the sun per view sample.
pub const MIN_LIGHT_SAMPLES: u32 = 1;

/// Upper bound for light samples marched toward the sun per view sample.
pub const MAX_LIGHT_SAMPLES: u32 = 50;

/// Floor for the view ray step size (world units).
pub const MIN_STEP_SIZE: f32 = 0.01;

/// Floor for shape/detail noise scale before taking the reciprocal.
pub const MIN_NOISE_SCALE: f32 = 0.1;

/// Floor for the cloud container thickness above the surface.
pub const MIN_MAX_CLOUD_HEIGHT: f32 = 0.001;

/// History blend is clamped below 1.0: a blend of 1.0 would freeze history.
pub const MAX_HISTORY_BLEND: f32 = 0.99;

/// Scatter strength is authored in thousandths.
pub const SCATTER_STRENGTH_UNIT: f32 = 1e-3;

/// Atmosphere blend factor is authored in units of 4e-6 per metre.
pub const ATMO_BLEND_UNIT: f32 = 4e-6;

/// Depth threshold is authored in percent of view depth.
pub const DEPTH_THRESHOLD_UNIT: f32 = 0.01;

/// Side length of the tiled blue-noise texture in output pixels.
pub const BLUE_NOISE_TILE: f32 = 512.0;

/// Fraction of the far camera's depth range the raymarch may reach.
pub const MAX_DEPTH_FRACTION: f32 = 0.9;

/// Linear depth marker for pixels with no geometry.
pub const EMPTY_DEPTH: f32 = f32::INFINITY;

/// Largest render target edge accepted by the target allocator.
pub const MAX_TARGET_DIMENSION: u32 = 16_384;

/// Reference wavelength (nm) at which the scattering tint is 1.0.
pub const REFERENCE_WAVELENGTH_NM: f32 = 550.0;

/// Default seed for the noise synthesizer.
pub const DEFAULT_NOISE_SEED: u32 = 0;
