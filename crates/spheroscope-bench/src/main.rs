//! spheroscope-bench: CLI tool for running spheroid analyses on image files.
//!
//! Runs the analysis engine on a given image with configurable parameters,
//! printing the final measurements and per-stage timings. Useful for:
//!
//! - Tuning the magic wand tolerance and simplification for a data set
//! - Checking how edge refinement moves a contour
//! - Comparing automatic cell counts against manual ones
//! - Producing an SVG overlay to inspect the result by eye
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin spheroscope-bench -- [OPTIONS] <IMAGE_PATH>
//! ```
//!
//! Set `RUST_LOG=debug` to see the engine's own diagnostics.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use serde::Serialize;
use spheroscope_engine::{
    AnalysisReport, AnalysisSession, CellPolarity, Dimensions, EngineConfig, Point, Scale,
    pixels::decode,
};
use spheroscope_export::{SvgMetadata, to_svg};

/// Spheroid migration analysis from the command line.
///
/// Selects the core with the magic wand at the seed point, optionally
/// snaps it to edges, marks the radii, counts cells, and prints the
/// report with per-stage timings.
#[derive(Parser)]
#[command(name = "spheroscope-bench", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, TIFF, WebP).
    image_path: PathBuf,

    /// Magic wand seed x coordinate (defaults to the image center).
    #[arg(long)]
    seed_x: Option<f64>,

    /// Magic wand seed y coordinate (defaults to the image center).
    #[arg(long)]
    seed_y: Option<f64>,

    /// Magic wand gray-level tolerance.
    #[arg(long, default_value_t = EngineConfig::DEFAULT_MAGIC_WAND_TOLERANCE)]
    tolerance: u8,

    /// RDP simplification tolerance for the core contour, in pixels.
    #[arg(long, default_value_t = EngineConfig::DEFAULT_CONTOUR_SIMPLIFY_TOLERANCE)]
    simplify_tolerance: f64,

    /// Snap the core contour to nearby edges after selection.
    #[arg(long)]
    refine: bool,

    /// Edge search distance along each normal, in pixels.
    #[arg(long, default_value_t = EngineConfig::DEFAULT_REFINE_SEARCH_DISTANCE)]
    search_distance: u32,

    /// Run automatic cell detection.
    #[arg(long)]
    detect_cells: bool,

    /// Which side of the threshold counts as a cell.
    #[arg(long, value_enum, default_value_t = Polarity::Bright)]
    cell_polarity: Polarity,

    /// Minimum detected cell size in pixels.
    #[arg(long, default_value_t = EngineConfig::DEFAULT_CELL_MIN_PIXELS)]
    cell_min_pixels: usize,

    /// Maximum migration point as `X,Y`.
    #[arg(long, value_parser = parse_point)]
    migration_point: Option<Point>,

    /// Halo point as `X,Y`.
    #[arg(long, value_parser = parse_point)]
    halo_point: Option<Point>,

    /// Scale bar length in pixels.
    #[arg(long, default_value_t = 1.0)]
    scale_pixels: f64,

    /// Scale bar length in micrometers.
    #[arg(long, default_value_t = 1.0)]
    scale_micrometers: f64,

    /// Write an SVG overlay to file.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Output the report as JSON instead of a human-readable table.
    #[arg(long)]
    json: bool,

    /// Full engine config as a JSON string.
    ///
    /// When provided, all other engine parameter flags are ignored.
    /// Missing fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,
}

/// Cell polarity selection.
#[derive(Clone, Copy, ValueEnum)]
enum Polarity {
    /// Cells are brighter than the background.
    Bright,
    /// Cells are darker than the background.
    Dark,
}

/// Parse an `X,Y` pair into a [`Point`].
fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got {s:?}"))?;
    let x = x.trim().parse::<f64>().map_err(|e| format!("bad x {x:?}: {e}"))?;
    let y = y.trim().parse::<f64>().map_err(|e| format!("bad y {y:?}: {e}"))?;
    Ok(Point::new(x, y))
}

/// Build an [`EngineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<EngineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(EngineConfig {
        magic_wand_tolerance: cli.tolerance,
        contour_simplify_tolerance: cli.simplify_tolerance,
        refine_search_distance: cli.search_distance,
        cell_polarity: match cli.cell_polarity {
            Polarity::Bright => CellPolarity::Bright,
            Polarity::Dark => CellPolarity::Dark,
        },
        cell_min_pixels: cli.cell_min_pixels,
        ..EngineConfig::default()
    })
}

/// Wall-clock duration of one stage.
#[derive(Serialize)]
struct StageTiming {
    stage: &'static str,
    #[serde(rename = "duration_ms")]
    millis: f64,
}

/// Everything the bench prints for one image.
#[derive(Serialize)]
struct BenchOutput {
    image: String,
    width: u32,
    height: u32,
    blob_pixels: usize,
    contour_vertices: usize,
    detected_cells: Option<usize>,
    report: AnalysisReport,
    timings: Vec<StageTiming>,
}

/// Collects stage timings as the analysis proceeds.
#[derive(Default)]
struct Stopwatch {
    timings: Vec<StageTiming>,
}

impl Stopwatch {
    fn time<T>(&mut self, stage: &'static str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.record(stage, start.elapsed());
        out
    }

    fn record(&mut self, stage: &'static str, elapsed: Duration) {
        log::debug!("{stage}: {elapsed:?}");
        self.timings.push(StageTiming {
            stage,
            millis: elapsed.as_secs_f64() * 1000.0,
        });
    }
}

fn total_ms(timings: &[StageTiming]) -> f64 {
    timings.iter().map(|t| t.millis).sum()
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    let scale = Scale::new(cli.scale_pixels, cli.scale_micrometers);

    let mut session = match AnalysisSession::new(config, scale) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Invalid config: {e}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };
    eprintln!(
        "Image: {} ({} bytes)",
        cli.image_path.display(),
        image_bytes.len(),
    );
    eprintln!("Config: {:#?}", session.config());
    eprintln!();

    let mut watch = Stopwatch::default();

    let decoded = match watch.time("Decode", || decode(&image_bytes)) {
        Ok(img) => img,
        Err(e) => {
            eprintln!("Decode error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let image = watch
        .time("Prepare", || session.prepare(&decoded))
        .unwrap_or(decoded);
    let dimensions = Dimensions {
        width: image.width(),
        height: image.height(),
    };

    let seed = Point::new(
        cli.seed_x.unwrap_or_else(|| f64::from(dimensions.width) / 2.0),
        cli.seed_y.unwrap_or_else(|| f64::from(dimensions.height) / 2.0),
    );
    let wand = match watch.time("Magic Wand", || session.magic_wand(&image, seed)) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("Core selection failed at ({}, {}): {e}", seed.x, seed.y);
            return ExitCode::FAILURE;
        }
    };

    if cli.refine
        && let Err(e) = watch.time("Refine", || session.refine(&image))
    {
        eprintln!("Refinement skipped: {e}");
    }

    let radii = watch.time("Radii", || {
        if let Some(p) = cli.halo_point {
            session.set_halo_point(p)?;
        }
        if let Some(p) = cli.migration_point {
            session.set_migration_point(p)?;
        }
        Ok::<(), spheroscope_engine::AnalysisError>(())
    });
    if let Err(e) = radii {
        eprintln!("Radii not set: {e}");
    }

    let detected_cells = cli
        .detect_cells
        .then(|| watch.time("Cell Detection", || session.detect_cells(&image)));

    let Some(report) = session.report() else {
        eprintln!("Core could not be analyzed");
        return ExitCode::FAILURE;
    };

    let output = BenchOutput {
        image: cli.image_path.display().to_string(),
        width: dimensions.width,
        height: dimensions.height,
        blob_pixels: wand.pixel_count,
        contour_vertices: session.snapshot().manual_drawn_path.len(),
        detected_cells,
        report,
        timings: watch.timings,
    };

    if cli.json {
        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing report: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_report(&output);
    }

    if let Some(ref svg_path) = cli.svg {
        let title = cli
            .image_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("spheroscope");
        let desc = format!("{:?}", session.config());
        let metadata = SvgMetadata {
            title: Some(title),
            description: Some(&desc),
        };
        let svg = to_svg(session.snapshot(), dimensions, &metadata);
        match std::fs::write(svg_path, &svg) {
            Ok(()) => {
                eprintln!(
                    "SVG written to {} ({} bytes)",
                    svg_path.display(),
                    svg.len(),
                );
            }
            Err(e) => {
                eprintln!("Error writing SVG to {}: {e}", svg_path.display());
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

/// Print the report and timings as aligned text.
fn print_report(output: &BenchOutput) {
    let r = &output.report;
    println!(
        "{} ({}x{})\n{}",
        output.image,
        output.width,
        output.height,
        "=".repeat(60)
    );
    println!("{:<24} {:>12}", "Blob pixels", output.blob_pixels);
    println!("{:<24} {:>12}", "Contour vertices", output.contour_vertices);
    if let Some(n) = output.detected_cells {
        println!("{:<24} {:>12}", "Detected cells", n);
    }
    println!("{:<24} {:>12}", "Cell count", r.cell_count);
    println!();

    let rows: &[(&str, f64)] = &[
        ("Core radius (um)", r.core_radius_um),
        ("Halo migration (um)", r.halo_migration_um),
        ("Max migration (um)", r.max_migration_um),
        ("Migration area (um2)", r.migration_area_um2),
        ("Max diameter (um)", r.max_diameter_um),
        ("Circularity", r.circularity),
        ("Sphericity", r.sphericity),
        ("Compactness", r.compactness),
        ("Solidity", r.solidity),
        ("Convexity", r.convexity),
        ("Entropy", r.entropy),
        ("Skewness", r.skewness),
        ("Kurtosis", r.kurtosis),
        ("Mean", r.mean),
        ("Variance", r.variance),
        ("Mean gradient", r.mean_gradient),
        ("Variance gradient", r.variance_gradient),
    ];
    for (name, value) in rows {
        println!("{name:<24} {value:>12.4}");
    }

    println!();
    println!("{:<24} {:>12}", "Stage", "Duration");
    println!("{}", "-".repeat(40));
    for t in &output.timings {
        println!("{:<24} {:>10.3}ms", t.stage, t.millis);
    }
    println!("{:<24} {:>10.3}ms", "Total", total_ms(&output.timings));
}
