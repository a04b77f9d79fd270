//! enpitsu-bench: CLI tool for sketch parameter experimentation and diagnostics.
//!
//! Runs the pencil-sketch pipeline on a given image file with configurable
//! parameters, printing detailed per-stage diagnostics. Useful for:
//!
//! - Tuning thresholds (background, edge, noise) against real photos
//! - Measuring per-stage durations to identify bottlenecks
//! - Understanding how parameter changes affect mask and edge counts
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin enpitsu-bench -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use enpitsu_pipeline::{
    PipelineDiagnostics, PipelineError, PixelBuffer, SketchParams, StagedResult, Style,
};

/// Sketch parameter experimentation and diagnostics for enpitsu.
///
/// Runs the pencil-sketch pipeline on a given image with configurable
/// parameters and prints detailed per-stage timing and count diagnostics.
#[derive(Parser)]
#[command(name = "enpitsu-bench", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Transformation style.
    #[arg(long, value_enum, default_value_t = CliStyle::Pencil)]
    style: CliStyle,

    /// Brightness multiplier applied after contrast adjustment.
    #[arg(long, default_value_t = SketchParams::DEFAULT_BRIGHTNESS_FACTOR)]
    brightness_factor: f32,

    /// Contrast multiplier applied around the 128 midpoint.
    #[arg(long, default_value_t = SketchParams::DEFAULT_CONTRAST_FACTOR)]
    contrast_factor: f32,

    /// Peak normalized edge strength.
    #[arg(long, default_value_t = SketchParams::DEFAULT_EDGE_STRENGTH)]
    edge_strength: f32,

    /// Gradient magnitude that saturates edge strength.
    #[arg(long, default_value_t = SketchParams::DEFAULT_EDGE_THRESHOLD)]
    edge_threshold: f32,

    /// Darkest output gray for shadows and contours.
    #[arg(long, default_value_t = SketchParams::DEFAULT_SHADOW_GRAY)]
    shadow_gray: f32,

    /// Output gray at the shadow/highlight zone boundary.
    #[arg(long, default_value_t = SketchParams::DEFAULT_MID_GRAY)]
    mid_gray: f32,

    /// Adjusted tone above which output is pure white.
    #[arg(long, default_value_t = SketchParams::DEFAULT_HIGHLIGHT_THRESHOLD)]
    highlight_threshold: f32,

    /// Luminance above which a pixel is initially classified as background.
    #[arg(long, default_value_t = SketchParams::DEFAULT_BACKGROUND_THRESHOLD)]
    background_threshold: f32,

    /// Half-width of the square edge detection window.
    #[arg(long, default_value_t = SketchParams::DEFAULT_EDGE_RADIUS)]
    edge_radius: u32,

    /// Edge strength below which background may expand into a pixel.
    #[arg(long, default_value_t = SketchParams::DEFAULT_BACKGROUND_EDGE_THRESHOLD)]
    background_edge_threshold: f32,

    /// Gradient magnitude below which a neighbor is ignored as noise.
    #[arg(long, default_value_t = SketchParams::DEFAULT_NOISE_THRESHOLD)]
    noise_threshold: f32,

    /// Number of background dilation iterations.
    #[arg(long, default_value_t = SketchParams::DEFAULT_EXPAND_BACKGROUND)]
    expand_background: u32,

    /// Minimum 4-connected background region size to keep.
    #[arg(long, default_value_t = SketchParams::DEFAULT_MIN_CONNECTED_PIXELS)]
    min_connected_pixels: u32,

    /// Write the rendered sketch to a file (PNG recommended).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Full parameter record as a JSON string.
    ///
    /// When provided, all other parameter flags are ignored.
    /// The JSON must be a valid `SketchParams` serialization.
    #[arg(long)]
    params_json: Option<String>,
}

/// Transformation style selection.
#[derive(Clone, Copy, ValueEnum)]
enum CliStyle {
    /// Monochrome pencil-sketch rendering.
    Pencil,
    /// Reserved; exits with an unsupported-style error.
    Watercolor,
    /// Reserved; exits with an unsupported-style error.
    OilPainting,
}

impl From<CliStyle> for Style {
    fn from(style: CliStyle) -> Self {
        match style {
            CliStyle::Pencil => Self::Pencil,
            CliStyle::Watercolor => Self::Watercolor,
            CliStyle::OilPainting => Self::OilPainting,
        }
    }
}

/// Build a [`SketchParams`] from CLI arguments.
///
/// If `--params-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.  Otherwise, a record is
/// assembled from the individual flags.
fn params_from_cli(cli: &Cli) -> Result<SketchParams, String> {
    if let Some(ref json) = cli.params_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --params-json: {e}"));
    }

    Ok(SketchParams {
        brightness_factor: cli.brightness_factor,
        contrast_factor: cli.contrast_factor,
        edge_strength: cli.edge_strength,
        edge_threshold: cli.edge_threshold,
        shadow_gray: cli.shadow_gray,
        mid_gray: cli.mid_gray,
        highlight_threshold: cli.highlight_threshold,
        background_threshold: cli.background_threshold,
        edge_radius: cli.edge_radius,
        background_edge_threshold: cli.background_edge_threshold,
        noise_threshold: cli.noise_threshold,
        expand_background: cli.expand_background,
        min_connected_pixels: cli.min_connected_pixels,
    })
}

/// Dispatch by style, matching the contract of
/// [`enpitsu_pipeline::transform`] while keeping the staged outputs.
fn run_pipeline(
    buffer: PixelBuffer,
    style: Style,
    params: &SketchParams,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    match style {
        Style::Pencil => enpitsu_pipeline::process_staged(buffer, params),
        other => Err(PipelineError::UnsupportedStyle(other)),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let params = match params_from_cli(&cli) {
        Ok(p) => p,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    let style = Style::from(cli.style);

    let image = match image::open(&cli.image_path) {
        Ok(image) => image.to_rgba8(),
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Image: {} ({}x{})",
        cli.image_path.display(),
        image.width(),
        image.height(),
    );
    eprintln!("Style: {style}");
    eprintln!("Params: {params:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let buffer = PixelBuffer::from_image(image.clone());
        match run_pipeline(buffer, style, &params) {
            Ok((staged, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                }

                // Write the rendered sketch on the first run only.
                if run == 0
                    && let Some(ref output_path) = cli.output
                {
                    match staged.output.save(output_path) {
                        Ok(()) => {
                            eprintln!("Sketch written to {}", output_path.display());
                        }
                        Err(e) => {
                            eprintln!("Error writing sketch to {}: {e}", output_path.display());
                        }
                    }
                }

                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                eprintln!("Pipeline error: {e}");
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    // Print summary when multiple runs.
    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&PipelineDiagnostics) -> std::time::Duration;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[PipelineDiagnostics]) {
    debug_assert!(!all_diagnostics.is_empty(), "no diagnostics to summarize");

    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    // Per-stage means.
    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Validate", |d| d.validate.duration),
        ("Luminance", |d| d.luminance.duration),
        ("Background", |d| d.background.duration),
        ("Regions", |d| d.regions.duration),
        ("Edges", |d| d.edges.duration),
        ("Expansion", |d| d.expansion.duration),
        ("Tone Map", |d| d.tonemap.duration),
    ];

    for (name, extractor) in stage_extractors {
        let stage_mean = all_diagnostics
            .iter()
            .map(|d| extractor(d).as_secs_f64() * 1000.0)
            .sum::<f64>()
            / all_diagnostics.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}
