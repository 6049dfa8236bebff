use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};

/// The host camera as seen by one frame of the cloud pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub view: Mat4,
    pub proj: Mat4,
    pub position: Vec3,
}

impl CameraView {
    /// Right-handed perspective camera looking from `eye` at `target`.
    pub fn look_at(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y_rad: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        Self {
            view: Mat4::look_at_rh(eye, target, up),
            proj: Mat4::perspective_rh(fov_y_rad, aspect, near, far),
            position: eye,
        }
    }

    pub fn view_proj(&self) -> Mat4 {
        self.proj * self.view
    }

    pub fn inv_view_proj(&self) -> Mat4 {
        self.view_proj().inverse()
    }

    /// World-space ray direction through texture coordinate `uv`
    /// (origin top-left).
    pub fn ray_direction(&self, uv: Vec2) -> Vec3 {
        RayCaster::new(self).direction(uv)
    }
}

/// Per-frame cache of the inverse matrices used to build view rays.
/// Rays are built in view space and rotated, so large world coordinates
/// do not cost precision.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RayCaster {
    inv_proj: Mat4,
    inv_view: Mat4,
}

impl RayCaster {
    pub(crate) fn new(camera: &CameraView) -> Self {
        Self {
            inv_proj: camera.proj.inverse(),
            inv_view: camera.view.inverse(),
        }
    }

    pub(crate) fn direction(&self, uv: Vec2) -> Vec3 {
        let ndc = uv_to_ndc(uv);
        let p = self.inv_proj * glam::Vec4::new(ndc.x, ndc.y, 0.5, 1.0);
        let view_dir = p.xyz() / p.w;
        self.inv_view.transform_vector3(view_dir).normalize_or_zero()
    }
}

pub(crate) fn uv_to_ndc(uv: Vec2) -> Vec2 {
    Vec2::new(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0)
}

pub(crate) fn ndc_to_uv(ndc: Vec2) -> Vec2 {
    Vec2::new((ndc.x + 1.0) * 0.5, (1.0 - ndc.y) * 0.5)
}

/// Project a world point with `view_proj`. Returns the texture coordinate
/// when the point lies in front of the camera.
pub fn project_to_uv(view_proj: &Mat4, world: Vec3) -> Option<Vec2> {
    let clip = *view_proj * world.extend(1.0);
    if clip.w <= 1e-6 {
        return None;
    }
    Some(ndc_to_uv(clip.xy() / clip.w))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> CameraView {
        CameraView::look_at(
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::ZERO,
            Vec3::Y,
            std::f32::consts::FRAC_PI_2,
            1.0,
            0.1,
            1000.0,
        )
    }

    #[test]
    fn test_centre_ray_points_at_target() {
        let cam = camera();
        let dir = cam.ray_direction(Vec2::splat(0.5));
        assert!((dir - Vec3::NEG_Z).length() < 1e-4, "dir {dir}");
    }

    #[test]
    fn test_top_left_uv_is_up_and_left() {
        let dir = camera().ray_direction(Vec2::new(0.0, 0.0));
        assert!(dir.x < 0.0 && dir.y > 0.0);
    }

    #[test]
    fn test_inverse_view_proj_unprojects_centre() {
        let cam = camera();
        let near = cam.inv_view_proj().project_point3(Vec3::ZERO);
        assert!((near - Vec3::new(0.0, 0.0, 9.9)).length() < 1e-3, "near {near}");
    }

    #[test]
    fn test_project_inverts_ray() {
        let cam = camera();
        let uv = Vec2::new(0.3, 0.7);
        let point = cam.position + cam.ray_direction(uv) * 25.0;
        let back = project_to_uv(&cam.view_proj(), point).expect("in front");
        assert!((back - uv).length() < 1e-4);
        assert!(project_to_uv(&cam.view_proj(), Vec3::new(0.0, 0.0, 20.0)).is_none());
    }
}
