//! Resolution changes between the output and the cloud buffer.

use glam::Vec2;

use crate::image::{pixel_uv, ColorImage, DepthImage};

/// Reduce `src` into `dst` keeping the nearest depth of each covered block,
/// so thin foreground geometry survives the downsample.
pub(crate) fn downsample_min_depth(src: &DepthImage, dst: &mut DepthImage) {
    if src.extent() == dst.extent() {
        dst.blit_from(src);
        return;
    }
    let (sw, sh) = (src.width() as u64, src.height() as u64);
    let (dw, dh) = (dst.width() as u64, dst.height() as u64);

    for y in 0..dst.height() {
        let y0 = (y as u64 * sh / dh) as u32;
        let y1 = (((y as u64 + 1) * sh).div_ceil(dh) as u32).clamp(y0 + 1, src.height());
        for x in 0..dst.width() {
            let x0 = (x as u64 * sw / dw) as u32;
            let x1 = (((x as u64 + 1) * sw).div_ceil(dw) as u32).clamp(x0 + 1, src.width());
            let mut nearest = f32::INFINITY;
            for sy in y0..y1 {
                for sx in x0..x1 {
                    nearest = nearest.min(src.get(sx, sy));
                }
            }
            dst.set(x, y, nearest);
        }
    }
}

/// Bilateral weight of a low-res sample whose depth is `low` for a full-res
/// pixel at depth `full`.
fn depth_weight(full: f32, low: f32, threshold: f32) -> f32 {
    match (full.is_finite(), low.is_finite()) {
        (false, false) => 1.0,
        (true, true) => {
            let tolerance = threshold * full + 1e-3;
            (-(full - low).abs() / tolerance).exp()
        }
        _ => 0.0,
    }
}

/// Depth-aware upscale of `cloud` to `out`. At native resolution this is a
/// plain copy.
pub(crate) fn upscale(
    cloud: &ColorImage,
    low_depth: &DepthImage,
    full_depth: &DepthImage,
    depth_threshold: f32,
    native_res: bool,
    out: &mut ColorImage,
) {
    if native_res {
        out.blit_from(cloud);
        return;
    }

    let low = cloud.extent();
    let low_size = Vec2::new(low.width as f32, low.height as f32);
    let extent = out.extent();

    for y in 0..extent.height {
        for x in 0..extent.width {
            let p = pixel_uv(x, y, extent) * low_size - Vec2::splat(0.5);
            let base = p.floor();
            let f = p - base;
            let (bx, by) = (base.x as i64, base.y as i64);
            let d_full = full_depth.get_clamped(i64::from(x), i64::from(y));

            let taps = [
                (bx, by, (1.0 - f.x) * (1.0 - f.y)),
                (bx + 1, by, f.x * (1.0 - f.y)),
                (bx, by + 1, (1.0 - f.x) * f.y),
                (bx + 1, by + 1, f.x * f.y),
            ];

            let mut sum = [0.0f32; 4];
            let mut total = 0.0f32;
            let mut closest = (f32::INFINITY, cloud.get_clamped(bx, by));
            for (tx, ty, w) in taps {
                let d_low = low_depth.get_clamped(tx, ty);
                let c = cloud.get_clamped(tx, ty);
                let diff = if d_low.is_infinite() && d_full.is_infinite() {
                    0.0
                } else {
                    (d_low - d_full).abs()
                };
                if diff < closest.0 {
                    closest = (diff, c);
                }
                let wt = w * depth_weight(d_full, d_low, depth_threshold);
                for i in 0..4 {
                    sum[i] += c[i] * wt;
                }
                total += wt;
            }

            let color = if total > 1e-4 {
                sum.map(|v| v / total)
            } else {
                closest.1
            };
            out.set(x, y, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Extent;

    #[test]
    fn test_downsample_keeps_nearest() {
        let mut src = DepthImage::new(Extent::new(4, 4), 100.0);
        src.set(1, 1, 5.0);
        src.set(3, 2, f32::INFINITY);
        let mut dst = DepthImage::new(Extent::new(2, 2), 0.0);
        downsample_min_depth(&src, &mut dst);
        assert_eq!(dst.get(0, 0), 5.0);
        assert_eq!(dst.get(1, 0), 100.0);
        assert_eq!(dst.get(1, 1), 100.0);
    }

    #[test]
    fn test_downsample_non_integer_ratio_covers_source() {
        let mut src = DepthImage::new(Extent::new(5, 3), 50.0);
        src.set(4, 2, 1.0);
        let mut dst = DepthImage::new(Extent::new(2, 2), 0.0);
        downsample_min_depth(&src, &mut dst);
        assert_eq!(dst.get(1, 1), 1.0);
    }

    #[test]
    fn test_native_upscale_is_copy() {
        let mut cloud = ColorImage::new(Extent::new(3, 3), [0.0; 4]);
        cloud.set(1, 2, [0.5, 0.25, 0.125, 0.75]);
        let depth = DepthImage::new(Extent::new(3, 3), 10.0);
        let mut out = ColorImage::new(Extent::new(3, 3), [9.0; 4]);
        upscale(&cloud, &depth, &depth, 0.01, true, &mut out);
        assert_eq!(out, cloud);
    }

    #[test]
    fn test_upscale_respects_depth_edges() {
        // left half sky, right half a near wall
        let low_extent = Extent::new(2, 1);
        let mut cloud = ColorImage::new(low_extent, [0.0; 4]);
        cloud.set(0, 0, [1.0, 1.0, 1.0, 1.0]);
        let mut low_depth = DepthImage::new(low_extent, f32::INFINITY);
        low_depth.set(1, 0, 10.0);

        let full_extent = Extent::new(4, 1);
        let mut full_depth = DepthImage::new(full_extent, f32::INFINITY);
        full_depth.set(2, 0, 10.0);
        full_depth.set(3, 0, 10.0);

        let mut out = ColorImage::new(full_extent, [0.5; 4]);
        upscale(&cloud, &low_depth, &full_depth, 0.01, false, &mut out);
        // the sky pixel next to the wall takes no cloud from the wall sample
        assert_eq!(out.get(1, 0), [1.0; 4]);
        // the wall pixel next to the sky takes nothing from the sky sample
        assert_eq!(out.get(2, 0), [0.0; 4]);
    }
}
