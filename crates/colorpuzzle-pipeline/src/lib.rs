//! colorpuzzle-pipeline: Pure puzzle scoring pipeline (sans-IO).
//!
//! Scores a physical color-ordering puzzle from two camera frames:
//! background subtraction -> HSV color classification ->
//! left-to-right ordering -> positional scoring.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! frames and returns structured data. Camera capture, display and
//! report files live with the host.

pub mod annotate;
pub mod classify;
pub mod diagnostics;
pub mod face;
pub mod foreground;
pub mod hsv;
pub mod order;
pub mod score;
pub mod session;
pub mod target;
pub mod types;

use serde::{Deserialize, Serialize};

pub use annotate::{annotate, annotate_with_color};
pub use classify::detect_colors;
pub use diagnostics::{Clock, NullClock, PipelineDiagnostics};
pub use face::{FaceMatcher, IdentityStatus, MseFaceMatcher, normalize_face};
pub use foreground::{extract_foreground, foreground_mask};
pub use hsv::{Hsv, HsvRange};
pub use order::infer_order;
pub use score::{Feedback, ScoreResult, score};
pub use session::Session;
pub use target::TargetSequence;
pub use types::{
    ChannelOrder, ColorLabel, ColorRanges, DetectionResult, Dimensions, GrayImage,
    PipelineConfig, PipelineError, Position, RgbImage,
};

use diagnostics::{AnalysisSummary, ColorMetrics, StageDiagnostics, StageMetrics};

/// Outcome of analysing one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Size of the analysed frames.
    pub dimensions: Dimensions,
    /// Where each color was found.
    pub detection: DetectionResult,
    /// Found colors, left to right.
    pub detected: Vec<ColorLabel>,
    /// Comparison against the target.
    pub score: ScoreResult,
    /// Encouragement tier for the score.
    pub feedback: Feedback,
}

/// Decode image bytes (PNG, JPEG, BMP, WebP) into an RGB frame.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the format is unrecognized
/// or the data is corrupt.
pub fn decode_frame(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

/// Run the full scoring pipeline.
///
/// # Pipeline steps
///
/// 1. Background subtraction (difference threshold + median filter)
/// 2. HSV classification of the isolated foreground
/// 3. Left-to-right ordering of found colors
/// 4. Positional scoring against `target`
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` fails validation,
/// [`PipelineError::DimensionMismatch`] if the frames differ in size, and
/// [`PipelineError::EmptyTarget`] if `target` is empty.
pub fn analyze(
    background: &RgbImage,
    snapshot: &RgbImage,
    target: &[ColorLabel],
    config: &PipelineConfig,
) -> Result<Analysis, PipelineError> {
    analyze_with_diagnostics(background, snapshot, target, config, &NullClock)
        .map(|(analysis, _)| analysis)
}

/// Run the full scoring pipeline, collecting per-stage diagnostics.
///
/// # Errors
///
/// Same as [`analyze`].
pub fn analyze_with_diagnostics<C: Clock>(
    background: &RgbImage,
    snapshot: &RgbImage,
    target: &[ColorLabel],
    config: &PipelineConfig,
    clock: &C,
) -> Result<(Analysis, PipelineDiagnostics), PipelineError> {
    config.validate()?;
    if target.is_empty() {
        return Err(PipelineError::EmptyTarget);
    }
    let dimensions = foreground::check_dimensions(background, snapshot)?;
    let run_start = clock.now();

    // 1. Background subtraction.
    let start = clock.now();
    let mask = foreground::foreground_mask(
        background,
        snapshot,
        config.channel_order,
        config.diff_threshold,
        config.median_window,
    )?;
    let isolated = foreground::apply_mask(snapshot, &mask);
    let foreground = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Foreground {
            threshold: config.diff_threshold,
            median_window: config.median_window,
            foreground_pixel_count: foreground::count_foreground(&mask),
            total_pixel_count: dimensions.pixel_count(),
        },
    };

    // 2. Color classification.
    let start = clock.now();
    let scans = classify::scan_colors(&isolated, config.channel_order, &config.color_ranges);
    let detection = classify::detection_from_scans(&scans);
    let classification = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Classification {
            colors: scans.iter().map(ColorMetrics::from).collect(),
        },
    };

    // 3. Ordering.
    let start = clock.now();
    let detected = order::infer_order(&detection);
    let ordering = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Ordering {
            detected: detected.clone(),
        },
    };

    // 4. Scoring.
    let start = clock.now();
    let result = score::score(&detected, target)?;
    let scoring = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Scoring {
            correct: result.correct,
            wrong: result.wrong,
            missing: result.missing,
            accuracy: result.accuracy,
        },
    };

    let diagnostics = PipelineDiagnostics {
        foreground,
        classification,
        ordering,
        scoring,
        total_duration: clock.elapsed(&run_start),
        summary: AnalysisSummary {
            image_width: dimensions.width,
            image_height: dimensions.height,
            pixel_count: dimensions.pixel_count(),
            detected_count: detected.len(),
            accuracy: result.accuracy,
        },
    };

    let analysis = Analysis {
        dimensions,
        detection,
        detected,
        feedback: Feedback::from_accuracy(result.accuracy),
        score: result,
    };
    Ok((analysis, diagnostics))
}
