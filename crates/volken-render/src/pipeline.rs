//! Per-frame orchestration of the cloud passes.
//!
//! The host drives a [`CloudRenderPipeline`] through three signals: attach
//! and detach with the scene, atmosphere present or not, and a depth-ready
//! notification from [`DepthCapture`]. Once all three line up, every
//! `render_frame` runs the full pass chain; otherwise the source image is
//! passed through untouched.

use std::rc::Rc;

use glam::{Mat4, Vec2, Vec3};
use volken_core::constants::MAX_DEPTH_FRACTION;
use volken_core::math::wrap_unit_vec3;
use volken_core::{CloudConfig, SharedCloudConfig, VolkenError};
use volken_noise::{hash_to_unit, noise_hash, CloudNoiseSet};

use crate::camera::{CameraView, RayCaster};
use crate::composite::composite;
use crate::depth::{DepthBuffers, DepthCapture, DepthHandle, DepthReady};
use crate::image::{ColorImage, Extent};
use crate::raymarch::{raymarch, History};
use crate::resample::{downsample_min_depth, upscale};
use crate::targets::{RenderTargetSet, TargetRequest};
use crate::uniforms::{CloudUniforms, FrameParameters};

const BLUE_NOISE_SEED: u32 = 0xB10E_5EED;

/// Lifecycle of the pipeline relative to the host scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Unattached,
    /// In a scene, but the current body has no atmosphere.
    Attached,
    AttachedWithClouds,
}

/// Why a frame was passed through without clouds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassThroughReason {
    Unattached,
    NoAtmosphere,
    Disabled,
    NoDepth,
    StaleDepth,
    TargetAllocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Rendered { native_res: bool, history_used: bool },
    PassThrough(PassThroughReason),
}

impl FrameOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, FrameOutcome::Rendered { .. })
    }
}

/// Host-supplied per-frame inputs.
#[derive(Debug, Clone, Copy)]
pub struct FrameInput {
    pub camera: CameraView,
    /// Direction the sunlight travels.
    pub sun_direction: Vec3,
    pub planet_center: Vec3,
    pub planet_radius: f32,
    pub planet_axis: Vec3,
    /// Local north at the camera, used for wind.
    pub north: Vec3,
    /// Local east at the camera, used for wind.
    pub east: Vec3,
    pub delta_time: f32,
    pub frame_index: u64,
    /// Overrides the ray length limit derived from the far camera.
    pub max_depth: Option<f32>,
}

/// What the previous rendered frame left behind for reprojection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemporalState {
    pub prev_view_proj: Mat4,
    pub has_history: bool,
}

impl Default for TemporalState {
    fn default() -> Self {
        Self {
            prev_view_proj: Mat4::IDENTITY,
            has_history: false,
        }
    }
}

pub struct CloudRenderPipeline {
    config: SharedCloudConfig,
    noise: Rc<CloudNoiseSet>,
    state: PipelineState,
    targets: Option<RenderTargetSet>,
    /// Request whose allocation failed; not retried until the request changes.
    failed_request: Option<TargetRequest>,
    depth_handle: Option<DepthHandle>,
    temporal: TemporalState,
    wind_offset: Vec3,
    rotation: f32,
    uniforms: Option<CloudUniforms>,
}

impl CloudRenderPipeline {
    pub fn new(config: SharedCloudConfig, noise: Rc<CloudNoiseSet>) -> Self {
        let wind_offset = wrap_unit_vec3(config.borrow().offset_vec());
        Self {
            config,
            noise,
            state: PipelineState::Unattached,
            targets: None,
            failed_request: None,
            depth_handle: None,
            temporal: TemporalState::default(),
            wind_offset,
            rotation: 0.0,
            uniforms: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn config(&self) -> &SharedCloudConfig {
        &self.config
    }

    pub fn targets(&self) -> Option<&RenderTargetSet> {
        self.targets.as_ref()
    }

    pub fn temporal(&self) -> &TemporalState {
        &self.temporal
    }

    pub fn wind_offset(&self) -> Vec3 {
        self.wind_offset
    }

    /// Accumulated planet rotation in radians. Not wrapped.
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Parameter block of the last rendered frame.
    pub fn uniforms(&self) -> Option<&CloudUniforms> {
        self.uniforms.as_ref()
    }

    pub fn depth_handle(&self) -> Option<DepthHandle> {
        self.depth_handle
    }

    /// Enter a scene rendering to `output`. Allocation failures are logged
    /// and surface as pass-through frames.
    pub fn attach(&mut self, output: Extent) {
        let config = self.config.borrow().clone();
        self.wind_offset = wrap_unit_vec3(config.offset_vec());
        self.rotation = 0.0;
        self.temporal = TemporalState::default();
        self.failed_request = None;

        let request = TargetRequest {
            output,
            scale: config.effective_resolution_scale(),
        };
        // failure is remembered in failed_request and reported per frame
        let _ = self.ensure_targets(request);

        if self.state == PipelineState::Unattached {
            self.state = PipelineState::Attached;
        }
        log::info!(
            "Cloud pipeline attached at {}x{}",
            output.width,
            output.height
        );
    }

    /// Atmosphere presence of the current body; toggles cloud rendering.
    pub fn set_atmosphere(&mut self, present: bool) {
        self.state = match (self.state, present) {
            (PipelineState::Unattached, _) => {
                log::debug!("atmosphere signal ignored while unattached");
                PipelineState::Unattached
            }
            (_, true) => PipelineState::AttachedWithClouds,
            (_, false) => {
                self.temporal.has_history = false;
                PipelineState::Attached
            }
        };
    }

    /// Leave the scene and release every target.
    pub fn detach(&mut self) {
        if self.targets.take().is_some() {
            log::info!("Cloud render targets released");
        }
        self.failed_request = None;
        self.depth_handle = None;
        self.temporal = TemporalState::default();
        self.uniforms = None;
        self.state = PipelineState::Unattached;
    }

    pub fn on_depth_ready(&mut self, ready: DepthReady) {
        log::debug!("cloud pipeline received depth buffers {:?}", ready.handle);
        self.depth_handle = Some(ready.handle);
    }

    /// Swap in regenerated noise. History is discarded.
    pub fn set_noise(&mut self, noise: Rc<CloudNoiseSet>) {
        self.noise = noise;
        self.temporal.has_history = false;
        log::info!("Cloud noise replaced");
    }

    /// Render clouds over `source` into `destination`.
    ///
    /// The shared configuration is read exactly once, at the start of the
    /// frame; writes made while the frame runs apply from the next frame.
    /// Any failure copies `source` to `destination` unchanged.
    pub fn render_frame(
        &mut self,
        input: &FrameInput,
        depth: &DepthCapture,
        source: &ColorImage,
        destination: &mut ColorImage,
    ) -> FrameOutcome {
        let config = self.config.borrow().clone();

        let buffers = match self.gate(&config, depth) {
            Ok(buffers) => buffers,
            Err(reason) => return self.pass_through(reason, source, destination),
        };

        let request = TargetRequest {
            output: source.extent(),
            scale: config.effective_resolution_scale(),
        };
        if self.ensure_targets(request).is_err() {
            return self.pass_through(PassThroughReason::TargetAllocation, source, destination);
        }

        self.advance_dynamics(&config, input);

        let Some(targets) = self.targets.as_mut() else {
            destination.clone_from(source);
            return FrameOutcome::PassThrough(PassThroughReason::TargetAllocation);
        };
        let native_res = targets.is_native_res();
        let max_depth = input
            .max_depth
            .unwrap_or(buffers.far_clip * MAX_DEPTH_FRACTION);

        let uniforms = CloudUniforms::new(
            &config,
            &FrameParameters {
                camera: input.camera,
                prev_view_proj: self.temporal.prev_view_proj,
                sun_direction: input.sun_direction,
                planet_center: input.planet_center,
                planet_radius: input.planet_radius,
                planet_axis: input.planet_axis,
                wind_offset: self.wind_offset,
                rotation: self.rotation,
                blue_noise_offset: blue_noise_offset(input.frame_index),
                max_depth,
                cloud_extent: targets.cloud_extent(),
                output_extent: targets.output_extent(),
                has_history: self.temporal.has_history,
                native_res,
            },
        );

        crate::depth::combine(buffers, &mut targets.combined_depth);
        downsample_min_depth(&targets.combined_depth, &mut targets.low_res_depth);

        let history = if self.temporal.has_history {
            Some(History {
                color: &targets.history_color,
                depth: &targets.history_depth,
                prev_view_proj: self.temporal.prev_view_proj,
            })
        } else {
            None
        };
        raymarch(
            &uniforms,
            &self.noise,
            &RayCaster::new(&input.camera),
            &targets.low_res_depth,
            history,
            &mut targets.cloud_color,
        );

        targets.history_color.blit_from(&targets.cloud_color);
        targets.history_depth.blit_from(&targets.low_res_depth);

        upscale(
            &targets.cloud_color,
            &targets.low_res_depth,
            &targets.combined_depth,
            uniforms.depth_threshold,
            native_res,
            &mut targets.upscaled,
        );

        if destination.extent() != source.extent() {
            *destination = ColorImage::new(source.extent(), [0.0; 4]);
        }
        composite(
            source,
            &targets.upscaled,
            &targets.combined_depth,
            uniforms.near_threshold,
            destination,
        );

        let history_used = self.temporal.has_history && uniforms.history_blend > 0.0;
        self.temporal = TemporalState {
            prev_view_proj: input.camera.view_proj(),
            has_history: true,
        };
        self.uniforms = Some(uniforms);

        FrameOutcome::Rendered {
            native_res,
            history_used,
        }
    }

    fn gate<'d>(
        &self,
        config: &CloudConfig,
        depth: &'d DepthCapture,
    ) -> Result<&'d DepthBuffers, PassThroughReason> {
        match self.state {
            PipelineState::Unattached => return Err(PassThroughReason::Unattached),
            PipelineState::Attached => return Err(PassThroughReason::NoAtmosphere),
            PipelineState::AttachedWithClouds => {}
        }
        if !config.enabled {
            return Err(PassThroughReason::Disabled);
        }
        let handle = self.depth_handle.ok_or(PassThroughReason::NoDepth)?;
        depth.resolve(handle).ok_or(PassThroughReason::StaleDepth)
    }

    fn pass_through(
        &mut self,
        reason: PassThroughReason,
        source: &ColorImage,
        destination: &mut ColorImage,
    ) -> FrameOutcome {
        log::debug!("cloud frame passed through: {reason:?}");
        destination.clone_from(source);
        self.temporal.has_history = false;
        FrameOutcome::PassThrough(reason)
    }

    /// Make the target set match `request`, rebuilding it whole when it
    /// does not. A request that already failed is not retried.
    fn ensure_targets(&mut self, request: TargetRequest) -> Result<(), VolkenError> {
        if self.targets.as_ref().is_some_and(|t| t.matches(&request)) {
            return Ok(());
        }
        if self.failed_request == Some(request) {
            return Err(VolkenError::ResourceAllocation(
                "target request previously failed".into(),
            ));
        }

        match RenderTargetSet::allocate(request) {
            Ok(set) => {
                self.targets = Some(set);
                self.failed_request = None;
                self.temporal.has_history = false;
                Ok(())
            }
            Err(e) => {
                log::warn!("Cloud render target allocation failed: {e}");
                self.failed_request = Some(request);
                Err(e)
            }
        }
    }

    fn advance_dynamics(&mut self, config: &CloudConfig, input: &FrameInput) {
        let heading = config.wind_direction.to_radians();
        let wind = heading.cos() * input.north + heading.sin() * input.east;
        self.wind_offset =
            wrap_unit_vec3(self.wind_offset + config.wind_speed * input.delta_time * wind);
        self.rotation += config.global_rotation_angular * input.delta_time;
    }
}

/// Per-frame blue-noise offset, a pure function of the frame index.
fn blue_noise_offset(frame_index: u64) -> Vec2 {
    let lo = frame_index as u32 as i32;
    let hi = (frame_index >> 32) as u32 as i32;
    Vec2::new(
        hash_to_unit(noise_hash(lo, hi, 0, BLUE_NOISE_SEED)),
        hash_to_unit(noise_hash(lo, hi, 1, BLUE_NOISE_SEED)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use volken_noise::{NoiseSettings, NoiseSynthesizer};

    fn pipeline(config: CloudConfig) -> CloudRenderPipeline {
        let noise = CloudNoiseSet::generate(&NoiseSynthesizer::new(1), &NoiseSettings::preview())
            .expect("preview settings");
        CloudRenderPipeline::new(config.into_shared(), Rc::new(noise))
    }

    fn input(delta_time: f32) -> FrameInput {
        FrameInput {
            camera: CameraView::look_at(Vec3::Z, Vec3::ZERO, Vec3::Y, 1.0, 1.0, 0.1, 100.0),
            sun_direction: Vec3::NEG_Y,
            planet_center: Vec3::new(0.0, -1000.0, 0.0),
            planet_radius: 1000.0,
            planet_axis: Vec3::Y,
            north: Vec3::NEG_Z,
            east: Vec3::X,
            delta_time,
            frame_index: 0,
            max_depth: None,
        }
    }

    #[test]
    fn test_state_machine() {
        let mut p = pipeline(CloudConfig::session_default());
        assert_eq!(p.state(), PipelineState::Unattached);
        p.set_atmosphere(true);
        assert_eq!(p.state(), PipelineState::Unattached);

        p.attach(Extent::new(32, 16));
        assert_eq!(p.state(), PipelineState::Attached);
        assert!(p.targets().is_some());

        p.set_atmosphere(true);
        assert_eq!(p.state(), PipelineState::AttachedWithClouds);
        p.set_atmosphere(false);
        assert_eq!(p.state(), PipelineState::Attached);

        p.set_atmosphere(true);
        p.detach();
        assert_eq!(p.state(), PipelineState::Unattached);
        assert!(p.targets().is_none());
        assert!(p.depth_handle().is_none());
    }

    #[test]
    fn test_wind_offset_stays_wrapped() {
        let config = CloudConfig {
            wind_speed: 0.37,
            wind_direction: 215.0,
            offset: [3.5, -0.25, 0.0],
            ..CloudConfig::session_default()
        };
        let mut p = pipeline(config.clone());
        assert!((p.wind_offset() - Vec3::new(0.5, 0.75, 0.0)).length() < 1e-6);
        for _ in 0..10_000 {
            p.advance_dynamics(&config, &input(1.0 / 30.0));
            let o = p.wind_offset();
            for c in o.to_array() {
                assert!((0.0..1.0).contains(&c), "offset {o}");
            }
        }
    }

    #[test]
    fn test_wind_follows_heading() {
        let config = CloudConfig {
            wind_speed: 0.1,
            wind_direction: 90.0,
            ..CloudConfig::session_default()
        };
        let mut p = pipeline(config.clone());
        p.advance_dynamics(&config, &input(1.0));
        // 90 degrees blows east
        assert!((p.wind_offset() - Vec3::new(0.1, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_rotation_accumulates_unbounded() {
        let config = CloudConfig {
            global_rotation_angular: 2.0,
            ..CloudConfig::session_default()
        };
        let mut p = pipeline(config.clone());
        for _ in 0..100 {
            p.advance_dynamics(&config, &input(0.5));
        }
        assert!((p.rotation() - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_blue_noise_offset_deterministic() {
        assert_eq!(blue_noise_offset(7), blue_noise_offset(7));
        assert_ne!(blue_noise_offset(7), blue_noise_offset(8));
        let o = blue_noise_offset(u64::MAX);
        assert!((0.0..1.0).contains(&o.x) && (0.0..1.0).contains(&o.y));
    }

    #[test]
    fn test_failed_request_not_retried_until_changed() {
        let mut p = pipeline(CloudConfig::session_default());
        p.attach(Extent::new(0, 0));
        assert!(p.targets().is_none());
        let zero = TargetRequest {
            output: Extent::new(0, 0),
            scale: 0.5,
        };
        assert!(p.ensure_targets(zero).is_err());
        assert_eq!(p.failed_request, Some(zero));

        let good = TargetRequest {
            output: Extent::new(8, 8),
            scale: 0.5,
        };
        assert!(p.ensure_targets(good).is_ok());
        assert!(p.failed_request.is_none());
        assert_eq!(p.targets().map(|t| t.cloud_extent()), Some(Extent::new(4, 4)));
    }

    #[test]
    fn test_unattached_frame_passes_through() {
        let mut p = pipeline(CloudConfig::session_default());
        let depth = DepthCapture::new();
        let source = ColorImage::new(Extent::new(4, 4), [0.3, 0.2, 0.1, 1.0]);
        let mut dst = ColorImage::new(Extent::new(1, 1), [0.0; 4]);
        let outcome = p.render_frame(&input(0.016), &depth, &source, &mut dst);
        assert_eq!(
            outcome,
            FrameOutcome::PassThrough(PassThroughReason::Unattached)
        );
        assert_eq!(dst, source);
    }
}
