use std::cell::RefCell;
use std::rc::Rc;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::math;

/// Configuration shared between the host's control layer and the renderer.
///
/// Writers mutate it between frames; the renderer clones it once per frame.
pub type SharedCloudConfig = Rc<RefCell<CloudConfig>>;

/// Parameter record for one cloud preset.
///
/// Values are stored as authored. Anything that could break the renderer
/// (zero step size, zero scale, out-of-range sample counts) is clamped by
/// the `effective_*` accessors at the point of use, never rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    // -- shape / appearance --
    pub enabled: bool,
    pub density: f32,
    pub absorption: f32,
    pub ambient_light: f32,
    pub coverage: f32,
    pub shape_scale: f32,
    pub detail_scale: f32,
    pub detail_strength: f32,
    /// RGBA tint applied to scattered light.
    pub cloud_color: [f32; 4],
    /// Noise-space units per second.
    pub wind_speed: f32,
    /// Degrees clockwise from north.
    pub wind_direction: f32,
    /// Radians per second around the planet axis.
    pub global_rotation_angular: f32,
    /// Starting wind offset, seeded into the renderer on attach.
    pub offset: [f32; 3],
    pub scatter_strength: f32,
    pub atmo_blend_factor: f32,
    /// (forward g, backward g, forward lobe weight, base brightness)
    pub phase_parameters: [f32; 4],

    // -- vertical layering --
    pub layer_heights: [f32; 2],
    pub layer_spreads: [f32; 2],
    pub layer_strengths: [f32; 2],
    pub max_cloud_height: f32,

    // -- lighting / scattering --
    pub scatter_power: f32,
    pub multi_scatter_blend: f32,
    pub ambient_scatter_strength: f32,
    /// RGB wavelengths in nanometres.
    pub custom_wavelengths: [f32; 3],
    pub silver_lining_intensity: f32,
    pub forward_scattering_bias: f32,

    // -- quality / performance --
    pub resolution_scale: f32,
    pub step_size: f32,
    pub step_size_falloff: f32,
    pub num_light_sample_points: i32,
    pub blue_noise_strength: f32,
    pub depth_threshold: f32,
    pub history_blend: f32,
    pub history_depth_threshold: f32,
    /// Scene geometry nearer than this (world units) hides clouds entirely.
    pub near_threshold: f32,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self::create_default()
    }
}

/// A parameter that will be clamped when the renderer reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigIssue {
    pub field: &'static str,
    pub value: f32,
    pub clamped_to: f32,
}

/// Two-layer vertical density profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerProfile {
    pub heights: Vec2,
    pub spreads: Vec2,
    pub strengths: Vec2,
}

impl LayerProfile {
    /// Density multiplier at `height` above the surface.
    pub fn sample(&self, height: f32) -> f32 {
        math::layer_profile(height, self.heights, self.spreads, self.strengths)
    }
}

impl CloudConfig {
    /// Values of the "Default" named preset.
    pub fn create_default() -> Self {
        Self {
            enabled: true,
            density: 0.025,
            absorption: 0.4,
            ambient_light: 0.15,
            coverage: 0.0,
            shape_scale: 25_000.0,
            detail_scale: 25_000.0,
            detail_strength: 0.1,
            cloud_color: [1.0, 1.0, 1.0, 1.0],
            wind_speed: 0.0,
            wind_direction: 0.0,
            global_rotation_angular: 0.5,
            offset: [0.0; 3],
            scatter_strength: 1.0,
            atmo_blend_factor: 0.18,
            phase_parameters: [0.75, -0.75, 0.5, 0.5],
            layer_heights: [5765.137, 7414.373],
            layer_spreads: [2000.061, 1421.315],
            layer_strengths: [0.8, 1.5],
            max_cloud_height: 9400.0,
            scatter_power: 1.5,
            multi_scatter_blend: 0.3,
            ambient_scatter_strength: 0.62,
            custom_wavelengths: [680.0, 550.0, 450.0],
            silver_lining_intensity: 1.0,
            forward_scattering_bias: 0.65,
            resolution_scale: 1.0,
            step_size: 300.0,
            step_size_falloff: 3.0,
            num_light_sample_points: 15,
            blue_noise_strength: 2.0,
            depth_threshold: 0.12,
            history_blend: 0.0,
            history_depth_threshold: 0.05,
            near_threshold: 0.0,
        }
    }

    /// Starting configuration of a fresh session: half-resolution clouds
    /// with temporal accumulation.
    pub fn session_default() -> Self {
        Self {
            absorption: 0.5,
            ambient_light: 0.1,
            coverage: 0.25,
            shape_scale: 10_000.0,
            detail_scale: 2000.0,
            detail_strength: 0.5,
            global_rotation_angular: 0.0,
            atmo_blend_factor: 0.25,
            layer_heights: [2000.0, 4500.0],
            layer_spreads: [1000.0, 750.0],
            layer_strengths: [3.0, 1.5],
            max_cloud_height: 6500.0,
            resolution_scale: 0.5,
            step_size: 200.0,
            step_size_falloff: 1.0,
            num_light_sample_points: 10,
            depth_threshold: 0.1,
            history_blend: 0.9,
            ambient_scatter_strength: 0.5,
            forward_scattering_bias: 0.85,
            ..Self::create_default()
        }
    }

    /// Wrap this config for sharing with the renderer.
    pub fn into_shared(self) -> SharedCloudConfig {
        Rc::new(RefCell::new(self))
    }

    /// Replace every field with `source`'s (preset switch).
    pub fn copy_from(&mut self, source: &CloudConfig) {
        self.clone_from(source);
    }

    /// Cloud buffer scale in (0, 1]. Small positive scales are kept as is;
    /// the target extent itself never drops below one pixel.
    pub fn effective_resolution_scale(&self) -> f32 {
        if !self.resolution_scale.is_finite() || self.resolution_scale <= 0.0 {
            return MAX_RESOLUTION_SCALE;
        }
        self.resolution_scale.min(MAX_RESOLUTION_SCALE)
    }

    pub fn effective_light_samples(&self) -> u32 {
        self.num_light_sample_points
            .clamp(MIN_LIGHT_SAMPLES as i32, MAX_LIGHT_SAMPLES as i32) as u32
    }

    pub fn effective_step_size(&self) -> f32 {
        self.step_size.max(MIN_STEP_SIZE)
    }

    pub fn effective_max_cloud_height(&self) -> f32 {
        self.max_cloud_height.max(MIN_MAX_CLOUD_HEIGHT)
    }

    /// History weight used by temporal accumulation, bounded below 1.
    pub fn effective_history_blend(&self) -> f32 {
        self.history_blend.clamp(0.0, MAX_HISTORY_BLEND)
    }

    /// Noise-space frequency of the shape volume.
    pub fn shape_frequency(&self) -> f32 {
        1.0 / self.shape_scale.max(MIN_NOISE_SCALE)
    }

    /// Noise-space frequency of the detail volume.
    pub fn detail_frequency(&self) -> f32 {
        1.0 / self.detail_scale.max(MIN_NOISE_SCALE)
    }

    pub fn layer_profile(&self) -> LayerProfile {
        LayerProfile {
            heights: Vec2::from(self.layer_heights),
            spreads: Vec2::from(self.layer_spreads),
            strengths: Vec2::from(self.layer_strengths),
        }
    }

    pub fn wavelengths_vec(&self) -> Vec3 {
        Vec3::from(self.custom_wavelengths)
    }

    pub fn offset_vec(&self) -> Vec3 {
        Vec3::from(self.offset)
    }

    /// List every parameter the renderer will clamp. Never fails.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        let mut check = |field: &'static str, value: f32, clamped_to: f32| {
            if value != clamped_to {
                issues.push(ConfigIssue {
                    field,
                    value,
                    clamped_to,
                });
            }
        };

        check(
            "resolution_scale",
            self.resolution_scale,
            self.effective_resolution_scale(),
        );
        check(
            "num_light_sample_points",
            self.num_light_sample_points as f32,
            self.effective_light_samples() as f32,
        );
        check("step_size", self.step_size, self.effective_step_size());
        check(
            "max_cloud_height",
            self.max_cloud_height,
            self.effective_max_cloud_height(),
        );
        check(
            "history_blend",
            self.history_blend,
            self.effective_history_blend(),
        );
        check(
            "shape_scale",
            self.shape_scale,
            self.shape_scale.max(MIN_NOISE_SCALE),
        );
        check(
            "detail_scale",
            self.detail_scale,
            self.detail_scale.max(MIN_NOISE_SCALE),
        );

        issues
    }
}
