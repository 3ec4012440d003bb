//! colorpuzzle: score a color-ordering puzzle from two camera frames.
//!
//! Loads a saved background frame and a snapshot of the arranged pieces,
//! runs the scoring pipeline, and prints per-stage diagnostics plus the
//! attempt report. Useful for:
//!
//! - Checking a setup (lighting, backdrop) before a session
//! - Tuning the difference threshold, median window and HSV ranges
//! - Producing annotated snapshots and JSON reports for records
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin colorpuzzle -- [OPTIONS] <BACKGROUND> <SNAPSHOT>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use colorpuzzle_export::{ReportData, ReportMetadata};
use colorpuzzle_pipeline::diagnostics::Clock;
use colorpuzzle_pipeline::{
    ChannelOrder, FaceMatcher, IdentityStatus, MseFaceMatcher, PipelineConfig, Session,
    TargetSequence,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::EnvFilter;

/// Score a color-ordering puzzle snapshot against a saved background.
///
/// Isolates the pieces the child placed, finds the red, blue and green
/// pieces, reads them left to right, and compares that order with the
/// target. Prints per-stage timing and count diagnostics.
#[derive(Parser)]
#[command(name = "colorpuzzle", version)]
struct Cli {
    /// Frame of the empty scene (PNG, JPEG, BMP, WebP).
    background: PathBuf,

    /// Frame with the pieces arranged, same size as the background.
    snapshot: PathBuf,

    /// Target order as a comma-separated list, e.g. `red,blue,green`.
    ///
    /// When omitted, a random order is drawn.
    #[arg(long)]
    target: Option<TargetSequence>,

    /// Seed for the random target, for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,

    /// Minimum difference intensity (0-255) to count as foreground.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_DIFF_THRESHOLD)]
    diff_threshold: u8,

    /// Median filter window for the foreground mask (odd, 1 disables).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_MEDIAN_WINDOW)]
    median_window: u32,

    /// Mean squared error below which two face crops match.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_FACE_MAX_MSE)]
    face_max_mse: f64,

    /// Treat frames as BGR instead of RGB.
    #[arg(long)]
    bgr: bool,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// The JSON must be a valid `PipelineConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Write the snapshot with correct pieces boxed to this path.
    #[arg(long)]
    annotate: Option<PathBuf>,

    /// Write the attempt report as JSON to this path.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Child's name for the report.
    #[arg(long)]
    name: Option<String>,

    /// Session location for the report.
    #[arg(long)]
    location: Option<String>,

    /// Registered face crop for the identity check.
    #[arg(long, requires = "face")]
    reference_face: Option<PathBuf>,

    /// Live face crop to compare against `--reference-face`.
    #[arg(long, requires = "reference_face")]
    face: Option<PathBuf>,

    /// Log pipeline internals to stderr (overridden by `RUST_LOG`).
    #[arg(short, long)]
    verbose: bool,
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.  Otherwise, a config is
/// assembled from the individual flags.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(PipelineConfig {
        channel_order: if cli.bgr {
            ChannelOrder::Bgr
        } else {
            ChannelOrder::Rgb
        },
        diff_threshold: cli.diff_threshold,
        median_window: cli.median_window,
        face_max_mse: cli.face_max_mse,
        ..PipelineConfig::default()
    })
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise `--verbose` selects `debug` and
/// the default is `warn`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Read and decode one frame, reporting errors with the file path.
fn load_frame(path: &Path) -> Result<colorpuzzle_pipeline::RgbImage, String> {
    let bytes =
        std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    eprintln!("Frame: {} ({} bytes)", path.display(), bytes.len());
    colorpuzzle_pipeline::decode_frame(&bytes)
        .map_err(|e| format!("Error decoding {}: {e}", path.display()))
}

/// Read a face crop as grayscale.
fn load_face(path: &Path) -> Result<colorpuzzle_pipeline::GrayImage, String> {
    let bytes =
        std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    image::load_from_memory(&bytes)
        .map(|img| img.to_luma8())
        .map_err(|e| format!("Error decoding {}: {e}", path.display()))
}

/// Run the identity check if both face crops were given.
fn check_identity(cli: &Cli, config: &PipelineConfig) -> Result<IdentityStatus, String> {
    let (Some(reference), Some(face)) = (&cli.reference_face, &cli.face) else {
        return Ok(IdentityStatus::Mismatch);
    };
    let reference = load_face(reference)?;
    let face = load_face(face)?;
    let matched = MseFaceMatcher::from_config(config).matches(&reference, &face);
    Ok(IdentityStatus::from_matched(matched))
}

/// Save the annotated snapshot; the format follows the file extension.
fn write_annotated(image: &colorpuzzle_pipeline::RgbImage, path: &Path) -> Result<(), String> {
    image
        .save(path)
        .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
    eprintln!("Annotated snapshot written to {}", path.display());
    Ok(())
}

fn pick_target(cli: &Cli) -> TargetSequence {
    if let Some(ref target) = cli.target {
        return target.clone();
    }
    match cli.seed {
        Some(seed) => TargetSequence::shuffled(&mut StdRng::seed_from_u64(seed)),
        None => TargetSequence::shuffled(&mut rand::rng()),
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = config_from_cli(cli)?;
    let background = load_frame(&cli.background)?;
    let snapshot = load_frame(&cli.snapshot)?;
    let identity = check_identity(cli, &config)?;
    let target = pick_target(cli);

    eprintln!("Target: {target}");
    eprintln!("Config: {config:#?}");
    eprintln!();

    let session = Session::new(target)
        .with_background(background)
        .with_snapshot(snapshot)
        .with_identity(identity);

    let (analysis, diagnostics) = session
        .analyze_with_diagnostics(&config, &StdClock)
        .map_err(|e| format!("Pipeline error: {e}"))?;
    tracing::info!(
        accuracy = analysis.score.accuracy,
        identity = %session.identity(),
        "attempt scored"
    );

    if cli.json {
        let json = serde_json::to_string_pretty(&diagnostics)
            .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
        println!("{json}");
    } else {
        println!("{}", diagnostics.report());
    }

    let report = ReportData::from_analysis(
        &analysis,
        session.target(),
        session.identity(),
        ReportMetadata {
            child_name: cli.name.as_deref(),
            location: cli.location.as_deref(),
        },
    );
    if !cli.json {
        println!();
        println!("{}", report.to_text());
    }

    if let Some(ref annotate_path) = cli.annotate
        && let Some(snapshot) = session.snapshot()
    {
        let annotated = colorpuzzle_pipeline::annotate(
            snapshot,
            &analysis.detection,
            session.target(),
            config.channel_order,
        );
        write_annotated(&annotated, annotate_path)?;
    }

    if let Some(ref report_path) = cli.report {
        let json = report
            .to_json()
            .map_err(|e| format!("Error serializing report: {e}"))?;
        std::fs::write(report_path, &json)
            .map_err(|e| format!("Error writing {}: {e}", report_path.display()))?;
        eprintln!(
            "Report written to {} ({} bytes)",
            report_path.display(),
            json.len(),
        );
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}
