use std::path::Path;

use crate::runner::BenchmarkResult;

/// A complete baseline containing results from all scenes.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Baseline {
    pub timestamp: String,
    pub results: Vec<BenchmarkResult>,
}

/// Load a baseline from a JSON file. Returns None if the file is missing or
/// unreadable.
pub fn load_baseline(path: &Path) -> Option<Baseline> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(baseline) => Some(baseline),
        Err(e) => {
            log::warn!("Ignoring malformed baseline {}: {e}", path.display());
            None
        }
    }
}

/// Save a baseline to a JSON file.
pub fn save_baseline(path: &Path, baseline: &Baseline) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(baseline).map_err(std::io::Error::other)?;
    std::fs::write(path, json)
}

/// Compare current results against a baseline. Returns a list of regressions
/// (scene name, percent change) where the threshold is exceeded.
///
/// Scenes are matched by name and cloud resolution; a baseline recorded at a
/// different resolution is not comparable.
pub fn compare(
    current: &[BenchmarkResult],
    baseline: &Baseline,
    threshold_pct: f64,
) -> Vec<(String, f64)> {
    let mut regressions = Vec::new();

    for result in current {
        let Some(base) = baseline.results.iter().find(|b| {
            b.scene_name == result.scene_name
                && b.cloud_width == result.cloud_width
                && b.cloud_height == result.cloud_height
        }) else {
            continue;
        };
        if base.timings.mean_ms <= 0.0 {
            continue;
        }
        let pct_change =
            (result.timings.mean_ms - base.timings.mean_ms) / base.timings.mean_ms * 100.0;
        if pct_change > threshold_pct {
            regressions.push((result.scene_name.clone(), pct_change));
        }
    }

    regressions
}

/// Format results as a markdown summary table.
pub fn format_markdown(results: &[BenchmarkResult]) -> String {
    let mut out = String::new();
    out.push_str("| Scene | Output | Clouds | Rendered | Mean (ms) | Median (ms) | P95 (ms) | P99 (ms) | Min (ms) | Max (ms) |\n");
    out.push_str("|-------|--------|--------|----------|-----------|-------------|----------|----------|----------|----------|\n");

    for r in results {
        out.push_str(&format!(
            "| {} | {}x{} | {}x{} | {}/{} | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} |\n",
            r.scene_name,
            r.output_width,
            r.output_height,
            r.cloud_width,
            r.cloud_height,
            r.rendered_frames,
            r.frame_count,
            r.timings.mean_ms,
            r.timings.median_ms,
            r.timings.p95_ms,
            r.timings.p99_ms,
            r.timings.min_ms,
            r.timings.max_ms,
        ));
    }

    out
}

/// Format a comparison report showing regressions.
pub fn format_comparison(regressions: &[(String, f64)], threshold_pct: f64) -> String {
    if regressions.is_empty() {
        return format!(
            "All scenes within {:.0}% threshold. No regressions detected.\n",
            threshold_pct
        );
    }

    let mut out = String::new();
    out.push_str(&format!(
        "REGRESSIONS DETECTED (>{:.0}% threshold):\n",
        threshold_pct
    ));
    for (scene, pct) in regressions {
        out.push_str(&format!("  - {}: +{:.1}%\n", scene, pct));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{compute_timings, BenchmarkResult};

    fn result(name: &str, mean: f64, cloud: (u32, u32)) -> BenchmarkResult {
        BenchmarkResult {
            scene_name: name.to_string(),
            output_width: 64,
            output_height: 32,
            cloud_width: cloud.0,
            cloud_height: cloud.1,
            frame_count: 1,
            rendered_frames: 1,
            timings: compute_timings(&[mean]),
        }
    }

    #[test]
    fn test_compare_flags_slowdown_over_threshold() {
        let baseline = Baseline {
            timestamp: "t".into(),
            results: vec![result("a", 10.0, (32, 16)), result("b", 10.0, (32, 16))],
        };
        let current = [result("a", 10.5, (32, 16)), result("b", 12.0, (32, 16))];
        let regressions = compare(&current, &baseline, 10.0);
        assert_eq!(regressions.len(), 1);
        assert_eq!(regressions[0].0, "b");
        assert!((regressions[0].1 - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_compare_skips_other_resolutions() {
        let baseline = Baseline {
            timestamp: "t".into(),
            results: vec![result("a", 1.0, (16, 8))],
        };
        let current = [result("a", 50.0, (32, 16))];
        assert!(compare(&current, &baseline, 10.0).is_empty());
    }

    #[test]
    fn test_baseline_json_roundtrip() {
        let baseline = Baseline {
            timestamp: "bench-1".into(),
            results: vec![result("a", 3.0, (8, 4))],
        };
        let json = serde_json::to_string(&baseline).expect("serialize");
        let parsed: Baseline = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].cloud_width, 8);
        assert_eq!(parsed.results[0].timings.mean_ms, 3.0);
    }

    #[test]
    fn test_markdown_has_row_per_scene() {
        let md = format_markdown(&[result("a", 1.0, (8, 4)), result("b", 2.0, (8, 4))]);
        assert_eq!(md.lines().count(), 4);
        assert!(md.contains("| a | 64x32 | 8x4 | 1/1 |"));
    }
}
