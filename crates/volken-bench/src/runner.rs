use std::rc::Rc;
use std::time::Instant;

use volken_noise::CloudNoiseSet;
use volken_render::{
    CameraDepth, CloudRenderPipeline, ColorImage, DepthCapture, DepthImage, Extent,
};

use crate::scenes::{SceneConfig, FAR_CLIP, NEAR_CLIP};

/// Timing data for a single benchmark run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TimingSeries {
    pub mean_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

/// Result of a single scene benchmark.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BenchmarkResult {
    pub scene_name: String,
    pub output_width: u32,
    pub output_height: u32,
    pub cloud_width: u32,
    pub cloud_height: u32,
    pub frame_count: u32,
    /// Frames that actually drew clouds rather than passing through.
    pub rendered_frames: u32,
    pub timings: TimingSeries,
}

/// Runs the CPU reference pipeline against synthetic scenes.
pub struct BenchmarkRunner {
    noise: Rc<CloudNoiseSet>,
    frame_count: u32,
    output: Extent,
}

impl BenchmarkRunner {
    pub fn new(noise: CloudNoiseSet, frame_count: u32, output: Extent) -> Self {
        Self {
            noise: Rc::new(noise),
            frame_count,
            output,
        }
    }

    /// Run a single benchmark scene and return timing results.
    pub fn run_scene(&self, scene: &SceneConfig) -> BenchmarkResult {
        log::info!(
            "Running scene '{}' ({}x{} at scale {})...",
            scene.name,
            self.output.width,
            self.output.height,
            scene.resolution_scale
        );

        let config = scene.cloud_config().into_shared();
        let mut pipeline = CloudRenderPipeline::new(Rc::clone(&config), Rc::clone(&self.noise));
        pipeline.attach(self.output);
        pipeline.set_atmosphere(true);

        // open sky: every pixel at the far plane
        let sky = DepthImage::new(self.output, 1.0);
        let mut depth = DepthCapture::new();
        let far = CameraDepth {
            raw: &sky,
            near_clip: NEAR_CLIP,
            far_clip: FAR_CLIP,
        };
        if let Some(ready) = depth.capture(&far, &far) {
            pipeline.on_depth_ready(ready);
        }

        let source = ColorImage::new(self.output, [0.25, 0.45, 0.8, 1.0]);
        let mut destination = ColorImage::new(self.output, [0.0; 4]);
        let aspect = self.output.width as f32 / self.output.height.max(1) as f32;

        let mut frame_times = Vec::with_capacity(self.frame_count as usize);
        let mut rendered_frames = 0u32;

        for frame_index in 0..self.frame_count {
            let input = scene.frame_input(u64::from(frame_index), aspect);

            let frame_start = Instant::now();
            let outcome = pipeline.render_frame(&input, &depth, &source, &mut destination);
            let elapsed = frame_start.elapsed().as_secs_f64() * 1000.0;

            if outcome.is_rendered() {
                rendered_frames += 1;
            } else {
                log::warn!("  Frame {frame_index} passed through: {outcome:?}");
            }
            frame_times.push(elapsed);
        }

        let cloud = pipeline
            .targets()
            .map(|t| t.cloud_extent())
            .unwrap_or(self.output);

        let timings = compute_timings(&frame_times);
        log::info!(
            "  Done: mean={:.2}ms, p95={:.2}ms, p99={:.2}ms",
            timings.mean_ms,
            timings.p95_ms,
            timings.p99_ms
        );

        BenchmarkResult {
            scene_name: scene.name.to_string(),
            output_width: self.output.width,
            output_height: self.output.height,
            cloud_width: cloud.width,
            cloud_height: cloud.height,
            frame_count: self.frame_count,
            rendered_frames,
            timings,
        }
    }
}

/// Compute timing statistics from a list of frame times in milliseconds.
pub fn compute_timings(times: &[f64]) -> TimingSeries {
    if times.is_empty() {
        return TimingSeries {
            mean_ms: 0.0,
            median_ms: 0.0,
            p95_ms: 0.0,
            p99_ms: 0.0,
            min_ms: 0.0,
            max_ms: 0.0,
        };
    }

    let mut sorted = times.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };
    let p95_idx = ((n as f64) * 0.95).ceil() as usize;
    let p99_idx = ((n as f64) * 0.99).ceil() as usize;

    TimingSeries {
        mean_ms: mean,
        median_ms: median,
        p95_ms: sorted[p95_idx.min(n - 1)],
        p99_ms: sorted[p99_idx.min(n - 1)],
        min_ms: sorted[0],
        max_ms: sorted[n - 1],
    }
}

#[cfg(test)]
mod tests {
    use volken_noise::{NoiseSettings, NoiseSynthesizer};

    use super::*;
    use crate::scenes::standard_scenes;

    #[test]
    fn test_timings_empty() {
        let t = compute_timings(&[]);
        assert_eq!(t.mean_ms, 0.0);
        assert_eq!(t.max_ms, 0.0);
    }

    #[test]
    fn test_timings_statistics() {
        let times: Vec<f64> = (1..=10).rev().map(f64::from).collect();
        let t = compute_timings(&times);
        assert!((t.mean_ms - 5.5).abs() < 1e-9);
        assert!((t.median_ms - 5.5).abs() < 1e-9);
        assert_eq!(t.min_ms, 1.0);
        assert_eq!(t.max_ms, 10.0);
        assert_eq!(t.p95_ms, 10.0);
    }

    #[test]
    fn test_run_scene_renders_every_frame() {
        let noise = CloudNoiseSet::generate(&NoiseSynthesizer::default(), &NoiseSettings::preview())
            .expect("preview settings");
        let runner = BenchmarkRunner::new(noise, 3, Extent::new(8, 6));
        let scene = &standard_scenes()[1];
        let result = runner.run_scene(scene);
        assert_eq!(result.scene_name, scene.name);
        assert_eq!(result.rendered_frames, 3);
        assert_eq!((result.cloud_width, result.cloud_height), (4, 3));
        assert!(result.timings.min_ms <= result.timings.max_ms);
    }
}
