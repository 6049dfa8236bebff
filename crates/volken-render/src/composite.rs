use crate::image::{ColorImage, DepthImage};

/// `dst = src · (1 - α) + cloud.rgb`, leaving `src` untouched where scene
/// geometry is nearer than `near_threshold`. Source alpha is preserved.
pub(crate) fn composite(
    source: &ColorImage,
    clouds: &ColorImage,
    scene_depth: &DepthImage,
    near_threshold: f32,
    dst: &mut ColorImage,
) {
    for (i, out) in dst.pixels_mut().iter_mut().enumerate() {
        let src = source.pixels()[i];
        if scene_depth.pixels()[i] < near_threshold {
            *out = src;
            continue;
        }
        let c = clouds.pixels()[i];
        let keep = 1.0 - c[3];
        *out = [
            src[0] * keep + c[0],
            src[1] * keep + c[1],
            src[2] * keep + c[2],
            src[3],
        ];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Extent;

    #[test]
    fn test_over_operator() {
        let e = Extent::new(2, 1);
        let source = ColorImage::new(e, [0.2, 0.4, 0.6, 1.0]);
        let mut clouds = ColorImage::new(e, [0.0; 4]);
        clouds.set(1, 0, [0.5, 0.5, 0.5, 0.5]);
        let depth = DepthImage::new(e, f32::INFINITY);
        let mut dst = ColorImage::new(e, [0.0; 4]);
        composite(&source, &clouds, &depth, 0.0, &mut dst);
        assert_eq!(dst.get(0, 0), [0.2, 0.4, 0.6, 1.0]);
        let blended = dst.get(1, 0);
        for (got, want) in blended.iter().zip([0.6, 0.7, 0.8, 1.0]) {
            assert!((got - want).abs() < 1e-6, "{blended:?}");
        }
    }

    #[test]
    fn test_near_geometry_suppresses_clouds() {
        let e = Extent::new(2, 1);
        let source = ColorImage::new(e, [0.1, 0.1, 0.1, 1.0]);
        let clouds = ColorImage::new(e, [1.0, 1.0, 1.0, 1.0]);
        let mut depth = DepthImage::new(e, 1000.0);
        depth.set(0, 0, 2.0);
        let mut dst = ColorImage::new(e, [0.0; 4]);
        composite(&source, &clouds, &depth, 5.0, &mut dst);
        assert_eq!(dst.get(0, 0), source.get(0, 0));
        assert_eq!(dst.get(1, 0), [1.0, 1.0, 1.0, 1.0]);
    }
}
