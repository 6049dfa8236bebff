use glam::{Mat4, Vec2, Vec3, Vec4};
use volken_core::constants::{
    ATMO_BLEND_UNIT, BLUE_NOISE_TILE, DEPTH_THRESHOLD_UNIT, SCATTER_STRENGTH_UNIT,
};
use volken_core::math::wavelength_tint;
use volken_core::CloudConfig;

use crate::camera::CameraView;
use crate::image::Extent;

/// Per-frame values that do not come from the preset.
#[derive(Debug, Clone, Copy)]
pub struct FrameParameters {
    pub camera: CameraView,
    pub prev_view_proj: Mat4,
    /// Direction the sunlight travels (away from the sun).
    pub sun_direction: Vec3,
    pub planet_center: Vec3,
    pub planet_radius: f32,
    pub planet_axis: Vec3,
    pub wind_offset: Vec3,
    pub rotation: f32,
    pub blue_noise_offset: Vec2,
    pub max_depth: f32,
    pub cloud_extent: Extent,
    pub output_extent: Extent,
    pub has_history: bool,
    pub native_res: bool,
}

/// Cloud shader parameter block (480 bytes). Every authored value is
/// converted to shader units here, including the clamps on step size,
/// light samples, noise scale and container height.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CloudUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub inv_view_proj: [[f32; 4]; 4],
    pub prev_view_proj: [[f32; 4]; 4],
    /// xyz camera position, w max ray depth.
    pub camera_position: [f32; 4],
    pub camera_forward: [f32; 4],
    /// xyz planet centre, w surface radius.
    pub sphere_center: [f32; 4],
    /// xyz rotation axis, w accumulated rotation (radians).
    pub planet_axis: [f32; 4],
    pub light_dir: [f32; 4],
    pub cloud_offset: [f32; 4],
    pub cloud_color: [f32; 4],
    pub phase_params: [f32; 4],
    pub layer_heights: [f32; 2],
    pub layer_spreads: [f32; 2],
    pub layer_strengths: [f32; 2],
    pub max_cloud_height: f32,
    pub step_size: f32,
    /// Per-channel scattering tint, w silver lining intensity.
    pub wavelength_tint: [f32; 4],
    pub blue_noise_scale: [f32; 2],
    pub blue_noise_offset: [f32; 2],

    pub density: f32,
    pub absorption: f32,
    pub ambient_light: f32,
    pub coverage: f32,

    pub cloud_scale: f32,
    pub detail_scale: f32,
    pub detail_strength: f32,
    pub blue_noise_strength: f32,

    pub step_size_falloff: f32,
    pub num_light_sample_points: f32,
    pub scatter_strength: f32,
    pub atmo_blend_factor: f32,

    pub depth_threshold: f32,
    pub history_blend: f32,
    pub history_depth_threshold: f32,
    pub near_threshold: f32,

    pub scatter_power: f32,
    pub multi_scatter_blend: f32,
    pub ambient_scatter_strength: f32,
    pub forward_scattering_bias: f32,

    pub is_native_res: u32,
    pub has_history: u32,
    pub _padding: [u32; 2],
}

impl CloudUniforms {
    pub fn new(config: &CloudConfig, frame: &FrameParameters) -> Self {
        let view_proj = frame.camera.view_proj();
        let forward = frame.camera.view.inverse().transform_vector3(Vec3::NEG_Z);
        let tint = wavelength_tint(config.wavelengths_vec());
        let blue_noise_scale = Vec2::new(
            frame.cloud_extent.width as f32,
            frame.cloud_extent.height as f32,
        ) / BLUE_NOISE_TILE;

        Self {
            view_proj: view_proj.to_cols_array_2d(),
            inv_view_proj: frame.camera.inv_view_proj().to_cols_array_2d(),
            prev_view_proj: frame.prev_view_proj.to_cols_array_2d(),
            camera_position: frame.camera.position.extend(frame.max_depth).to_array(),
            camera_forward: forward.normalize_or_zero().extend(0.0).to_array(),
            sphere_center: frame.planet_center.extend(frame.planet_radius).to_array(),
            planet_axis: frame
                .planet_axis
                .normalize_or(Vec3::Y)
                .extend(frame.rotation)
                .to_array(),
            light_dir: frame
                .sun_direction
                .normalize_or_zero()
                .extend(0.0)
                .to_array(),
            cloud_offset: frame.wind_offset.extend(0.0).to_array(),
            cloud_color: config.cloud_color,
            phase_params: config.phase_parameters,
            layer_heights: config.layer_heights,
            layer_spreads: config.layer_spreads,
            layer_strengths: config.layer_strengths,
            max_cloud_height: config.effective_max_cloud_height(),
            step_size: config.effective_step_size(),
            wavelength_tint: tint.extend(config.silver_lining_intensity).to_array(),
            blue_noise_scale: blue_noise_scale.to_array(),
            blue_noise_offset: frame.blue_noise_offset.to_array(),
            density: config.density,
            absorption: config.absorption,
            ambient_light: config.ambient_light,
            coverage: config.coverage,
            cloud_scale: config.shape_frequency(),
            detail_scale: config.detail_frequency(),
            detail_strength: config.detail_strength,
            blue_noise_strength: config.blue_noise_strength,
            step_size_falloff: config.step_size_falloff,
            num_light_sample_points: config.effective_light_samples() as f32,
            scatter_strength: config.scatter_strength * SCATTER_STRENGTH_UNIT,
            atmo_blend_factor: config.atmo_blend_factor * ATMO_BLEND_UNIT,
            depth_threshold: config.depth_threshold * DEPTH_THRESHOLD_UNIT,
            history_blend: config.effective_history_blend(),
            history_depth_threshold: config.history_depth_threshold,
            near_threshold: config.near_threshold,
            scatter_power: config.scatter_power,
            multi_scatter_blend: config.multi_scatter_blend,
            ambient_scatter_strength: config.ambient_scatter_strength,
            forward_scattering_bias: config.forward_scattering_bias,
            is_native_res: u32::from(frame.native_res),
            has_history: u32::from(frame.has_history),
            _padding: [0; 2],
        }
    }

    pub fn camera_position(&self) -> Vec3 {
        Vec4::from(self.camera_position).truncate()
    }

    pub fn max_depth(&self) -> f32 {
        self.camera_position[3]
    }

    pub fn camera_forward(&self) -> Vec3 {
        Vec4::from(self.camera_forward).truncate()
    }

    pub fn sphere_center(&self) -> Vec3 {
        Vec4::from(self.sphere_center).truncate()
    }

    pub fn surface_radius(&self) -> f32 {
        self.sphere_center[3]
    }

    pub fn planet_axis(&self) -> Vec3 {
        Vec4::from(self.planet_axis).truncate()
    }

    pub fn rotation(&self) -> f32 {
        self.planet_axis[3]
    }

    pub fn light_dir(&self) -> Vec3 {
        Vec4::from(self.light_dir).truncate()
    }

    pub fn cloud_offset(&self) -> Vec3 {
        Vec4::from(self.cloud_offset).truncate()
    }

    pub fn prev_view_proj(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.prev_view_proj)
    }

    pub fn light_samples(&self) -> u32 {
        self.num_light_sample_points as u32
    }
}
