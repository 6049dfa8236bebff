use glam::Vec3;
use volken_core::CloudConfig;
use volken_render::{CameraView, FrameInput};

/// Planet radius shared by every benchmark scene.
pub const PLANET_RADIUS: f32 = 600_000.0;

pub const NEAR_CLIP: f32 = 0.1;
pub const FAR_CLIP: f32 = 200_000.0;

/// Configuration for a single benchmark scene.
pub struct SceneConfig {
    pub name: &'static str,
    pub resolution_scale: f32,
    /// Camera height above the planet surface in metres.
    pub altitude: f32,
    /// Direction the camera looks, in the local frame (+Y is up).
    pub look: [f32; 3],
    pub coverage: f32,
    pub history_blend: f32,
}

impl SceneConfig {
    /// Cloud configuration for this scene, starting from session defaults.
    pub fn cloud_config(&self) -> CloudConfig {
        CloudConfig {
            resolution_scale: self.resolution_scale,
            coverage: self.coverage,
            history_blend: self.history_blend,
            ..CloudConfig::session_default()
        }
    }

    /// Frame input for `frame_index` at the given output aspect ratio.
    pub fn frame_input(&self, frame_index: u64, aspect: f32) -> FrameInput {
        let eye = Vec3::new(0.0, PLANET_RADIUS + self.altitude, 0.0);
        let look = Vec3::from_array(self.look).normalize_or(Vec3::Y);
        // keep the up vector off the view axis when looking straight up or down
        let up = if look.cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::NEG_Z
        } else {
            Vec3::Y
        };
        FrameInput {
            camera: CameraView::look_at(eye, eye + look, up, 1.0, aspect, NEAR_CLIP, FAR_CLIP),
            sun_direction: Vec3::new(0.4, -0.8, 0.3).normalize(),
            planet_center: Vec3::ZERO,
            planet_radius: PLANET_RADIUS,
            planet_axis: Vec3::Y,
            north: Vec3::NEG_Z,
            east: Vec3::X,
            delta_time: 1.0 / 60.0,
            frame_index,
            max_depth: None,
        }
    }
}

/// Return the standard suite of benchmark scenes.
pub fn standard_scenes() -> Vec<SceneConfig> {
    vec![
        SceneConfig {
            name: "ground-quarter",
            resolution_scale: 0.25,
            altitude: 2.0,
            look: [0.0, 0.4, -1.0],
            coverage: 0.1,
            history_blend: 0.9,
        },
        SceneConfig {
            name: "ground-half",
            resolution_scale: 0.5,
            altitude: 2.0,
            look: [0.0, 0.4, -1.0],
            coverage: 0.1,
            history_blend: 0.9,
        },
        SceneConfig {
            name: "ground-native",
            resolution_scale: 1.0,
            altitude: 2.0,
            look: [0.0, 0.4, -1.0],
            coverage: 0.1,
            history_blend: 0.9,
        },
        SceneConfig {
            name: "overcast-half",
            resolution_scale: 0.5,
            altitude: 2.0,
            look: [0.0, 1.0, -0.2],
            coverage: 0.6,
            history_blend: 0.9,
        },
        SceneConfig {
            name: "above-layer-half",
            resolution_scale: 0.5,
            altitude: 9_000.0,
            look: [0.0, -0.5, -1.0],
            coverage: 0.3,
            history_blend: 0.0,
        },
    ]
}
