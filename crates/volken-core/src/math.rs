use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use crate::constants::REFERENCE_WAVELENGTH_NM;

/// Wrap a scalar into [0, 1). Non-finite input wraps to 0.
pub fn wrap_unit(v: f32) -> f32 {
    if !v.is_finite() {
        return 0.0;
    }
    let r = v.rem_euclid(1.0);
    // rem_euclid rounds tiny negative inputs up to exactly 1.0
    if r >= 1.0 {
        0.0
    } else {
        r
    }
}

/// Component-wise [`wrap_unit`].
pub fn wrap_unit_vec3(v: Vec3) -> Vec3 {
    Vec3::new(wrap_unit(v.x), wrap_unit(v.y), wrap_unit(v.z))
}

/// Quintic fade curve `6t^5 - 15t^4 + 10t^3`.
pub fn quintic(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

/// Interpolate `a..b` with the quintic fade applied to `t`.
pub fn smoother_lerp(a: f32, b: f32, t: f32) -> f32 {
    a + quintic(t) * (b - a)
}

/// Linearly remap `v` from `[lo0, hi0]` to `[lo1, hi1]`.
/// A degenerate source range maps everything to `lo1`.
pub fn remap(v: f32, lo0: f32, hi0: f32, lo1: f32, hi1: f32) -> f32 {
    let span = hi0 - lo0;
    if span.abs() < f32::EPSILON {
        return lo1;
    }
    lo1 + (v - lo0) * (hi1 - lo1) / span
}

/// Henyey-Greenstein phase function, normalised over the sphere.
pub fn henyey_greenstein(cos_theta: f32, g: f32) -> f32 {
    let g = g.clamp(-0.999, 0.999);
    let g2 = g * g;
    let denom = (1.0 + g2 - 2.0 * g * cos_theta).max(1e-6);
    (1.0 - g2) / (4.0 * PI * denom * denom.sqrt())
}

/// Two-lobe phase: `blend` weights the forward lobe against the backward one.
pub fn dual_lobe_phase(cos_theta: f32, g_forward: f32, g_backward: f32, blend: f32) -> f32 {
    let blend = blend.clamp(0.0, 1.0);
    blend * henyey_greenstein(cos_theta, g_forward)
        + (1.0 - blend) * henyey_greenstein(cos_theta, g_backward)
}

/// Isotropic phase value (1 / 4pi).
pub fn isotropic_phase() -> f32 {
    1.0 / (4.0 * PI)
}

/// Beer-Lambert transmittance for an optical depth.
pub fn beer_lambert(optical_depth: f32) -> f32 {
    (-optical_depth.max(0.0)).exp()
}

/// Intersect a normalised ray with a sphere. Returns entry/exit distances
/// along the ray (entry may be negative when the origin is inside).
pub fn ray_sphere(origin: Vec3, dir: Vec3, center: Vec3, radius: f32) -> Option<(f32, f32)> {
    let oc = origin - center;
    let b = oc.dot(dir);
    let c = oc.length_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let s = disc.sqrt();
    Some((-b - s, -b + s))
}

/// Segment of a ray (from its origin forward) lying inside the spherical
/// shell `[inner, outer]`, cut short where the ray meets the inner sphere.
pub fn ray_shell_segment(
    origin: Vec3,
    dir: Vec3,
    center: Vec3,
    inner: f32,
    outer: f32,
) -> Option<(f32, f32)> {
    let (t0, t1) = ray_sphere(origin, dir, center, outer)?;
    if t1 <= 0.0 {
        return None;
    }
    let mut start = t0.max(0.0);
    let mut end = t1;

    if let Some((i0, i1)) = ray_sphere(origin, dir, center, inner) {
        if i0 >= start {
            end = end.min(i0);
        } else if i1 > start {
            // origin is below the surface
            start = i1;
        }
    }

    (end > start).then_some((start, end))
}

/// Double-Gaussian vertical density profile at `height` above the surface.
pub fn layer_profile(height: f32, heights: Vec2, spreads: Vec2, strengths: Vec2) -> f32 {
    let layer = |h: f32, spread: f32, strength: f32| {
        let x = (height - h) / spread.max(1e-3);
        strength * (-x * x).exp()
    };
    layer(heights.x, spreads.x, strengths.x) + layer(heights.y, spreads.y, strengths.y)
}

/// Rayleigh-like per-channel tint `(550nm / lambda)^4`.
pub fn wavelength_tint(wavelengths_nm: Vec3) -> Vec3 {
    let f = |w: f32| (REFERENCE_WAVELENGTH_NM / w.max(1.0)).powi(4);
    Vec3::new(
        f(wavelengths_nm.x),
        f(wavelengths_nm.y),
        f(wavelengths_nm.z),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_unit_range() {
        for v in [-3.75, -1.0, -1e-9, 0.0, 0.5, 1.0, 2.25, 1e7] {
            let w = wrap_unit(v);
            assert!((0.0..1.0).contains(&w), "wrap_unit({v}) = {w}");
        }
        assert!((wrap_unit(2.25) - 0.25).abs() < 1e-6);
        assert!((wrap_unit(-0.25) - 0.75).abs() < 1e-6);
        assert_eq!(wrap_unit(f32::NAN), 0.0);
    }

    #[test]
    fn test_quintic_endpoints() {
        assert_eq!(quintic(0.0), 0.0);
        assert!((quintic(1.0) - 1.0).abs() < 1e-6);
        assert!((quintic(0.5) - 0.5).abs() < 1e-6);
        assert!((smoother_lerp(2.0, 4.0, 0.5) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_remap() {
        assert!((remap(0.5, 0.0, 1.0, 10.0, 20.0) - 15.0).abs() < 1e-5);
        assert_eq!(remap(3.0, 1.0, 1.0, 7.0, 9.0), 7.0);
    }

    #[test]
    fn test_hg_isotropic_when_g_zero() {
        for c in [-1.0, -0.3, 0.0, 0.7, 1.0] {
            assert!((henyey_greenstein(c, 0.0) - isotropic_phase()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_hg_forward_bias() {
        let forward = henyey_greenstein(1.0, 0.8);
        let back = henyey_greenstein(-1.0, 0.8);
        assert!(forward > back * 10.0);
        let mixed = dual_lobe_phase(1.0, 0.8, -0.8, 1.0);
        assert!((mixed - forward).abs() < 1e-5);
    }

    #[test]
    fn test_beer_lambert() {
        assert_eq!(beer_lambert(0.0), 1.0);
        assert_eq!(beer_lambert(-5.0), 1.0);
        assert!(beer_lambert(10.0) < 1e-4);
    }

    #[test]
    fn test_ray_sphere_hit_and_miss() {
        let hit = ray_sphere(Vec3::new(0.0, 0.0, -10.0), Vec3::Z, Vec3::ZERO, 2.0);
        let (t0, t1) = hit.expect("ray should hit");
        assert!((t0 - 8.0).abs() < 1e-4);
        assert!((t1 - 12.0).abs() < 1e-4);
        assert!(ray_sphere(Vec3::new(0.0, 5.0, -10.0), Vec3::Z, Vec3::ZERO, 2.0).is_none());
    }

    #[test]
    fn test_shell_segment_from_surface_looking_up() {
        let origin = Vec3::new(0.0, 100.0, 0.0);
        let (start, end) =
            ray_shell_segment(origin, Vec3::Y, Vec3::ZERO, 99.0, 110.0).expect("inside shell");
        assert_eq!(start, 0.0);
        assert!((end - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_shell_segment_stops_at_surface() {
        let origin = Vec3::new(0.0, 200.0, 0.0);
        let (start, end) =
            ray_shell_segment(origin, -Vec3::Y, Vec3::ZERO, 100.0, 110.0).expect("crosses shell");
        assert!((start - 90.0).abs() < 1e-3);
        assert!((end - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_layer_profile_peaks_at_layer_height() {
        let heights = Vec2::new(2000.0, 4500.0);
        let spreads = Vec2::new(1000.0, 750.0);
        let strengths = Vec2::new(3.0, 1.5);
        let at_peak = layer_profile(2000.0, heights, spreads, strengths);
        let between = layer_profile(3300.0, heights, spreads, strengths);
        let far_above = layer_profile(20_000.0, heights, spreads, strengths);
        assert!(at_peak > between);
        assert!(far_above < 1e-6);
    }

    #[test]
    fn test_wavelength_tint_blue_scatters_more() {
        let tint = wavelength_tint(Vec3::new(680.0, 550.0, 450.0));
        assert!((tint.y - 1.0).abs() < 1e-6);
        assert!(tint.z > tint.y && tint.y > tint.x);
    }
}
