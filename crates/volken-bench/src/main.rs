use std::path::PathBuf;
use std::process;
use std::time::Instant;

use volken_bench::report;
use volken_bench::runner::BenchmarkRunner;
use volken_bench::scenes;
use volken_noise::{CloudNoiseSet, NoiseSettings, NoiseSynthesizer};
use volken_render::Extent;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    let mut baseline_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;
    let mut regression_threshold = 10.0f64;
    let mut frame_count = 30u32;
    let mut width = 320u32;
    let mut height = 180u32;
    let mut full_noise = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--baseline" => {
                baseline_path = Some(PathBuf::from(value_of(&args, &mut i)));
            }
            "--output" => {
                output_path = Some(PathBuf::from(value_of(&args, &mut i)));
            }
            "--regression-threshold" => {
                regression_threshold = parse_value(&args, &mut i);
            }
            "--frames" => {
                frame_count = parse_value(&args, &mut i);
            }
            "--width" => {
                width = parse_value(&args, &mut i);
            }
            "--height" => {
                height = parse_value(&args, &mut i);
            }
            "--full-noise" => {
                full_noise = true;
            }
            "--help" | "-h" => {
                eprintln!("Usage: bench-runner [OPTIONS]");
                eprintln!("  --baseline <path>              Load baseline JSON for comparison");
                eprintln!("  --output <path>                Save current results as JSON baseline");
                eprintln!(
                    "  --regression-threshold <pct>   Regression threshold percentage (default: 10)"
                );
                eprintln!("  --frames <n>                   Frames per scene (default: 30)");
                eprintln!("  --width <px>                   Output width (default: 320)");
                eprintln!("  --height <px>                  Output height (default: 180)");
                eprintln!("  --full-noise                   Use production noise texture sizes");
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
        i += 1;
    }

    let settings = if full_noise {
        NoiseSettings::default()
    } else {
        NoiseSettings::preview()
    };
    log::info!("Generating noise textures...");
    let start = Instant::now();
    let noise = match CloudNoiseSet::generate(&NoiseSynthesizer::default(), &settings) {
        Ok(noise) => noise,
        Err(e) => {
            eprintln!("Noise generation failed: {e}");
            process::exit(1);
        }
    };
    log::info!("  Noise ready in {:.1}s", start.elapsed().as_secs_f64());

    let runner = BenchmarkRunner::new(noise, frame_count, Extent::new(width, height));

    let mut results = Vec::new();
    for scene in &scenes::standard_scenes() {
        results.push(runner.run_scene(scene));
    }

    println!("\n## Benchmark Results\n");
    println!("{}", report::format_markdown(&results));

    if let Some(ref path) = output_path {
        let baseline = report::Baseline {
            timestamp: run_timestamp(),
            results: results.clone(),
        };
        if let Err(e) = report::save_baseline(path, &baseline) {
            eprintln!("Failed to save baseline {}: {e}", path.display());
            process::exit(1);
        }
        log::info!("Saved baseline to {}", path.display());
    }

    if let Some(ref path) = baseline_path {
        if let Some(baseline) = report::load_baseline(path) {
            let regressions = report::compare(&results, &baseline, regression_threshold);
            println!(
                "{}",
                report::format_comparison(&regressions, regression_threshold)
            );
            if !regressions.is_empty() {
                eprintln!(
                    "ERROR: {} regressions detected, exiting with code 1",
                    regressions.len()
                );
                process::exit(1);
            }
        } else {
            log::warn!("Baseline file not found: {}", path.display());
        }
    }

    log::info!("Benchmark complete.");
}

/// Advance past a flag and return its value, exiting if it is missing.
fn value_of<'a>(args: &'a [String], i: &mut usize) -> &'a str {
    *i += 1;
    match args.get(*i) {
        Some(value) => value,
        None => {
            eprintln!("Missing value for {}", args[*i - 1]);
            process::exit(1);
        }
    }
}

fn parse_value<T: std::str::FromStr>(args: &[String], i: &mut usize) -> T {
    let raw = value_of(args, i);
    match raw.parse() {
        Ok(value) => value,
        Err(_) => {
            eprintln!("Invalid value for {}: {}", args[*i - 1], raw);
            process::exit(1);
        }
    }
}

fn run_timestamp() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("bench-{secs}")
}
