//! Cloud raymarch with temporal reprojection.
//!
//! Runs once per cloud-resolution pixel. Reads every parameter from the
//! [`CloudUniforms`] block so CPU and shader see identical inputs.

use glam::{Mat4, Quat, Vec2, Vec3};
use volken_core::constants::{EMPTY_DEPTH, SCATTER_STRENGTH_UNIT};
use volken_core::math::{
    beer_lambert, dual_lobe_phase, isotropic_phase, layer_profile, ray_shell_segment,
    ray_sphere, remap,
};
use volken_noise::CloudNoiseSet;

use crate::camera::{project_to_uv, RayCaster};
use crate::image::{pixel_uv, ColorImage, DepthImage};
use crate::uniforms::CloudUniforms;

/// Upper bound on view samples per pixel. Longer segments take
/// proportionally longer steps so the march still reaches the segment end.
const MAX_VIEW_STEPS: u32 = 256;

/// Marching stops once transmittance falls below this.
const MIN_TRANSMITTANCE: f32 = 0.01;

const SILVER_LINING_SHARPNESS: f32 = 8.0;

/// Density field of the cloud shell for one frame.
pub(crate) struct CloudVolume<'a> {
    u: &'a CloudUniforms,
    noise: &'a CloudNoiseSet,
    center: Vec3,
    radius: f32,
    top: f32,
    spin: Quat,
    offset: Vec3,
}

impl<'a> CloudVolume<'a> {
    pub(crate) fn new(u: &'a CloudUniforms, noise: &'a CloudNoiseSet) -> Self {
        let radius = u.surface_radius();
        Self {
            u,
            noise,
            center: u.sphere_center(),
            radius,
            top: radius + u.max_cloud_height,
            spin: Quat::from_axis_angle(u.planet_axis(), -u.rotation()),
            offset: u.cloud_offset(),
        }
    }

    pub(crate) fn density(&self, p: Vec3) -> f32 {
        let rel = p - self.center;
        let height = rel.length() - self.radius;
        if height < 0.0 || height > self.u.max_cloud_height {
            return 0.0;
        }
        let u = self.u;
        let profile = layer_profile(
            height,
            Vec2::from(u.layer_heights),
            Vec2::from(u.layer_spreads),
            Vec2::from(u.layer_strengths),
        );
        if profile <= 1e-4 {
            return 0.0;
        }

        let local = self.spin * rel;
        let (coverage_map, height_map) = self.noise.planet_map.sample(local);
        let cover = (coverage_map + u.coverage).clamp(0.0, 1.0);

        let shape = self
            .noise
            .shape
            .sample_trilinear(local * u.cloud_scale + self.offset);
        let base = remap(shape, 1.0 - cover, 1.0, 0.0, 1.0);
        if base <= 0.0 {
            return 0.0;
        }
        let detail = self
            .noise
            .detail
            .sample_trilinear(local * u.detail_scale + self.offset);
        let eroded = (base - detail * u.detail_strength * (1.0 - base)).max(0.0);

        eroded * profile * u.density * (0.5 + height_map)
    }

    /// Fraction of sunlight reaching `p` through the cloud above it.
    fn light_transmittance(&self, p: Vec3, to_sun: Vec3) -> f32 {
        if to_sun == Vec3::ZERO {
            return 1.0;
        }
        if let Some((t0, _)) = ray_sphere(p, to_sun, self.center, self.radius) {
            if t0 > 0.0 {
                // planet shadow
                return 0.0;
            }
        }
        let exit = match ray_sphere(p, to_sun, self.center, self.top) {
            Some((_, t1)) if t1 > 0.0 => t1,
            _ => return 1.0,
        };
        let samples = self.u.light_samples().max(1);
        let step = exit / samples as f32;
        let optical_depth: f32 = (0..samples)
            .map(|j| self.density(p + to_sun * ((j as f32 + 0.5) * step)) * step)
            .sum();
        beer_lambert(optical_depth * self.u.absorption / self.u.scatter_power.max(0.1))
    }

    fn phase(&self, cos_theta: f32) -> f32 {
        let u = self.u;
        let lobes = dual_lobe_phase(
            cos_theta,
            u.forward_scattering_bias,
            u.phase_params[1],
            u.phase_params[2],
        );
        let ambient = isotropic_phase() * u.ambient_scatter_strength;
        let mixed = lobes + (ambient - lobes) * u.multi_scatter_blend.clamp(0.0, 1.0);
        let silver = u.wavelength_tint[3]
            * cos_theta
                .max(0.0)
                .powf(SILVER_LINING_SHARPNESS * u.scatter_power.max(0.1));
        u.phase_params[3] + mixed + silver
    }
}

/// Result of marching one view ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MarchSample {
    /// Premultiplied cloud radiance, alpha is coverage.
    pub color: [f32; 4],
    /// Ray distance of the transmittance-weighted cloud centre.
    pub depth: f32,
}

impl MarchSample {
    const EMPTY: MarchSample = MarchSample {
        color: [0.0; 4],
        depth: EMPTY_DEPTH,
    };
}

/// March `dir` from `eye` up to `limit` (ray distance). `jitter` in [0, 1)
/// offsets the first sample by a fraction of a step.
pub(crate) fn march_ray(
    volume: &CloudVolume<'_>,
    eye: Vec3,
    dir: Vec3,
    limit: f32,
    jitter: f32,
) -> MarchSample {
    let u = volume.u;
    let Some((start, exit)) =
        ray_shell_segment(eye, dir, volume.center, volume.radius, volume.top)
    else {
        return MarchSample::EMPTY;
    };
    let end = exit.min(limit);
    if end <= start {
        return MarchSample::EMPTY;
    }

    let max_depth = u.max_depth().max(1e-3);
    let to_sun = -u.light_dir();
    let phase = volume.phase(dir.dot(to_sun));
    let tint = Vec3::from_slice(&u.cloud_color[..3]);

    let mut transmittance = 1.0f32;
    let mut radiance = Vec3::ZERO;
    let mut weighted_t = 0.0f32;
    let mut weight = 0.0f32;

    let base_step = u.step_size.max((end - start) / MAX_VIEW_STEPS as f32);
    let mut t = start + base_step * jitter * u.blue_noise_strength;
    while t < end {
        let step = base_step * (1.0 + u.step_size_falloff.max(0.0) * t / max_depth);
        let p = eye + dir * t;
        let sigma = volume.density(p);
        if sigma > 0.0 {
            let step_t = beer_lambert(sigma * step);
            let absorbed = transmittance * (1.0 - step_t);
            let light = volume.light_transmittance(p, to_sun);
            let lum = tint * (light * phase + u.ambient_light);
            radiance += lum * absorbed;
            weighted_t += t * absorbed;
            weight += absorbed;
            transmittance *= step_t;
            if transmittance < MIN_TRANSMITTANCE {
                break;
            }
        }
        t += step;
    }

    if weight <= 0.0 {
        return MarchSample::EMPTY;
    }

    let alpha = 1.0 - transmittance;
    let depth = weighted_t / weight;

    // aerial perspective: distant clouds fade toward scattered sky light
    let fade = beer_lambert(u.atmo_blend_factor * depth);
    let sky = Vec3::from_slice(&u.wavelength_tint[..3]);
    let sky = sky / sky.max_element().max(1e-6);
    let gain = u.scatter_strength / SCATTER_STRENGTH_UNIT;
    let rgb = radiance * fade + sky * (alpha * (1.0 - fade) * gain);

    MarchSample {
        color: [rgb.x, rgb.y, rgb.z, alpha],
        depth,
    }
}

/// History buffers and the matrix that maps this frame's world points into
/// them.
pub(crate) struct History<'a> {
    pub color: &'a ColorImage,
    pub depth: &'a DepthImage,
    pub prev_view_proj: Mat4,
}

fn lerp4(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    std::array::from_fn(|i| a[i] + (b[i] - a[i]) * t)
}

/// Accept history whose stored scene depth agrees with the current one.
pub(crate) fn history_depth_matches(history: f32, current: f32, threshold: f32) -> bool {
    if history.is_infinite() || current.is_infinite() {
        return history.is_infinite() && current.is_infinite();
    }
    (history - current).abs() <= threshold * current
}

/// Raymarch every pixel of `out`, blending with reprojected history when
/// `history` is given.
pub(crate) fn raymarch(
    u: &CloudUniforms,
    noise: &CloudNoiseSet,
    caster: &RayCaster,
    scene_depth: &DepthImage,
    history: Option<History<'_>>,
    out: &mut ColorImage,
) {
    let volume = CloudVolume::new(u, noise);
    let eye = u.camera_position();
    let forward = u.camera_forward();
    let max_depth = u.max_depth();
    let blend = u.history_blend;
    let extent = out.extent();
    let bn_scale = Vec2::from(u.blue_noise_scale);
    let bn_offset = Vec2::from(u.blue_noise_offset);

    for y in 0..extent.height {
        for x in 0..extent.width {
            let uv = pixel_uv(x, y, extent);
            let dir = caster.direction(uv);
            let depth = scene_depth.get(x, y);

            // linear depth is along the view axis
            let cos_forward = dir.dot(forward).max(1e-4);
            let scene_t = depth / cos_forward;
            let limit = scene_t.min(max_depth);

            let jitter = noise.blue_noise.sample_bilinear(uv * bn_scale + bn_offset);
            let sample = march_ray(&volume, eye, dir, limit, jitter);
            let mut color = sample.color;

            if let Some(h) = history.as_ref().filter(|_| blend > 0.0) {
                let t_rep = if sample.depth.is_finite() {
                    sample.depth
                } else if limit.is_finite() {
                    limit
                } else {
                    max_depth
                };
                if let Some(prev) = project_to_uv(&h.prev_view_proj, eye + dir * t_rep) {
                    if (0.0..1.0).contains(&prev.x) && (0.0..1.0).contains(&prev.y) {
                        let hx = ((prev.x * h.color.width() as f32) as u32).min(h.color.width() - 1);
                        let hy =
                            ((prev.y * h.color.height() as f32) as u32).min(h.color.height() - 1);
                        if history_depth_matches(
                            h.depth.get(hx, hy),
                            depth,
                            u.history_depth_threshold,
                        ) {
                            color = lerp4(color, h.color.get(hx, hy), blend);
                        }
                    }
                }
            }

            out.set(x, y, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraView;
    use crate::image::Extent;
    use crate::uniforms::FrameParameters;
    use volken_core::CloudConfig;
    use volken_noise::{NoiseSettings, NoiseSynthesizer};

    fn noise() -> CloudNoiseSet {
        CloudNoiseSet::generate(&NoiseSynthesizer::new(0), &NoiseSettings::preview())
            .expect("preview settings")
    }

    fn dense_config() -> CloudConfig {
        CloudConfig {
            coverage: 1.0,
            density: 0.05,
            shape_scale: 2000.0,
            detail_scale: 500.0,
            layer_heights: [300.0, 600.0],
            layer_spreads: [300.0, 300.0],
            layer_strengths: [2.0, 2.0],
            max_cloud_height: 1000.0,
            step_size: 25.0,
            step_size_falloff: 0.0,
            num_light_sample_points: 4,
            ..CloudConfig::session_default()
        }
    }

    fn uniforms(config: &CloudConfig, eye: Vec3, target: Vec3) -> CloudUniforms {
        let camera = CameraView::look_at(eye, target, Vec3::Z, 1.2, 1.0, 1.0, 20_000.0);
        CloudUniforms::new(
            config,
            &FrameParameters {
                camera,
                prev_view_proj: camera.view_proj(),
                sun_direction: Vec3::new(0.2, -1.0, 0.1),
                planet_center: Vec3::ZERO,
                planet_radius: 10_000.0,
                planet_axis: Vec3::Y,
                wind_offset: Vec3::ZERO,
                rotation: 0.0,
                blue_noise_offset: Vec2::ZERO,
                max_depth: 18_000.0,
                cloud_extent: Extent::new(8, 8),
                output_extent: Extent::new(8, 8),
                has_history: false,
                native_res: true,
            },
        )
    }

    #[test]
    fn test_density_zero_outside_shell() {
        let set = noise();
        let config = dense_config();
        let u = uniforms(&config, Vec3::new(0.0, 10_001.0, 0.0), Vec3::new(0.0, 20_000.0, 0.0));
        let vol = CloudVolume::new(&u, &set);
        assert_eq!(vol.density(Vec3::new(0.0, 9_000.0, 0.0)), 0.0);
        assert_eq!(vol.density(Vec3::new(0.0, 11_500.0, 0.0)), 0.0);
    }

    #[test]
    fn test_looking_up_through_full_coverage_hits_cloud() {
        let set = noise();
        let config = dense_config();
        let eye = Vec3::new(0.0, 10_001.0, 0.0);
        let u = uniforms(&config, eye, Vec3::new(0.0, 20_000.0, 0.0));
        let vol = CloudVolume::new(&u, &set);
        let sample = march_ray(&vol, eye, Vec3::Y, f32::INFINITY, 0.0);
        assert!(sample.color[3] > 0.0, "alpha {}", sample.color[3]);
        assert!(sample.depth > 0.0 && sample.depth < 1000.0);
        assert!(sample.color.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_scene_geometry_blocks_clouds() {
        let set = noise();
        let config = dense_config();
        let eye = Vec3::new(0.0, 12_000.0, 0.0);
        let u = uniforms(&config, eye, Vec3::ZERO);
        let vol = CloudVolume::new(&u, &set);
        let open = march_ray(&vol, eye, Vec3::NEG_Y, f32::INFINITY, 0.0);
        assert!(open.color[3] > 0.0);
        // terrain closer than the shell top
        let blocked = march_ray(&vol, eye, Vec3::NEG_Y, 500.0, 0.0);
        assert_eq!(blocked, MarchSample::EMPTY);
    }

    #[test]
    fn test_ray_missing_shell_is_empty() {
        let set = noise();
        let config = dense_config();
        let eye = Vec3::new(0.0, 50_000.0, 0.0);
        let u = uniforms(&config, eye, Vec3::new(0.0, 60_000.0, 0.0));
        let vol = CloudVolume::new(&u, &set);
        assert_eq!(march_ray(&vol, eye, Vec3::Y, f32::INFINITY, 0.0), MarchSample::EMPTY);
    }

    fn thin_config(step_size: f32) -> CloudConfig {
        CloudConfig {
            density: 0.0002,
            step_size,
            ..dense_config()
        }
    }

    #[test]
    fn test_alpha_stable_across_step_sizes() {
        let set = noise();
        let eye = Vec3::new(0.0, 10_001.0, 0.0);
        let target = Vec3::new(0.0, 20_000.0, 0.0);
        let alpha = |step: f32| {
            let config = thin_config(step);
            let u = uniforms(&config, eye, target);
            let vol = CloudVolume::new(&u, &set);
            march_ray(&vol, eye, Vec3::Y, f32::INFINITY, 0.0).color[3]
        };
        let fine = alpha(1.0);
        let coarse = alpha(8.0);
        assert!(fine > 1e-3, "alpha {fine}");
        assert!(
            (fine - coarse).abs() < 0.15 * coarse,
            "fine {fine} vs coarse {coarse}"
        );
    }

    #[test]
    fn test_long_segment_reaches_shell_exit() {
        let set = noise();
        let config = thin_config(1.0);
        let eye = Vec3::new(0.0, 10_001.0, 0.0);
        let u = uniforms(&config, eye, Vec3::new(10_000.0, 10_001.0, 0.0));
        let vol = CloudVolume::new(&u, &set);
        // grazing ray: about 4.5 km of shell, the layers are far from the eye
        let sample = march_ray(&vol, eye, Vec3::X, f32::INFINITY, 0.0);
        assert!(sample.color[3] > 0.0);
        assert!(
            sample.depth > 1000.0,
            "cloud depth {} stops short of the layers",
            sample.depth
        );
    }

    #[test]
    fn test_history_depth_matching() {
        assert!(history_depth_matches(100.0, 102.0, 0.05));
        assert!(!history_depth_matches(100.0, 120.0, 0.05));
        assert!(history_depth_matches(f32::INFINITY, f32::INFINITY, 0.05));
        assert!(!history_depth_matches(f32::INFINITY, 50.0, 0.05));
    }

    #[test]
    fn test_raymarch_fills_every_pixel() {
        let set = noise();
        let config = dense_config();
        let eye = Vec3::new(0.0, 10_001.0, 0.0);
        let u = uniforms(&config, eye, Vec3::new(0.0, 20_000.0, 0.0));
        let target = Vec3::new(0.0, 20_000.0, 0.0);
        let camera = CameraView::look_at(eye, target, Vec3::Z, 1.2, 1.0, 1.0, 20_000.0);
        let caster = RayCaster::new(&camera);
        let depth = DepthImage::new(Extent::new(8, 8), EMPTY_DEPTH);
        let mut out = ColorImage::new(Extent::new(8, 8), [-1.0; 4]);
        raymarch(&u, &set, &caster, &depth, None, &mut out);
        assert!(out.pixels().iter().all(|p| p[3] >= 0.0 && p[3] <= 1.0));
        assert!(out.pixels().iter().any(|p| p[3] > 0.0));
    }
}
