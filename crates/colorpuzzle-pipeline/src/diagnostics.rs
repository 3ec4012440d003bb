//! Analysis diagnostics: timing and counts for each stage.
//!
//! Every call to [`analyze_with_diagnostics`](crate::analyze_with_diagnostics)
//! collects these alongside the result. Timing goes through the [`Clock`]
//! trait so the host chooses the time source; the core never reads a
//! clock on its own.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::ColorScan;
use crate::types::{ColorLabel, Position};

/// Time source supplied by the host.
pub trait Clock {
    /// Opaque timestamp.
    type Instant;

    /// Current timestamp.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// A clock that always reports zero elapsed time.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullClock;

impl Clock for NullClock {
    type Instant = ();

    fn now(&self) {}

    fn elapsed(&self, _since: &()) -> Duration {
        Duration::ZERO
    }
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 1: background subtraction.
    pub foreground: StageDiagnostics,
    /// Stage 2: HSV color classification.
    pub classification: StageDiagnostics,
    /// Stage 3: left-to-right ordering.
    pub ordering: StageDiagnostics,
    /// Stage 4: positional scoring.
    pub scoring: StageDiagnostics,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: AnalysisSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Per-color classification counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorMetrics {
    pub label: ColorLabel,
    /// Pixels inside the color's HSV range.
    pub matched_pixels: u64,
    /// Outer regions traced for the color.
    pub region_count: usize,
    /// Chosen position, if the color was found.
    pub position: Option<Position>,
}

impl From<&ColorScan> for ColorMetrics {
    fn from(scan: &ColorScan) -> Self {
        Self {
            label: scan.label,
            matched_pixels: scan.matched_pixels,
            region_count: scan.region_count,
            position: scan.largest.as_ref().map(|r| r.bounds.center()),
        }
    }
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Background subtraction metrics.
    Foreground {
        /// Difference threshold used.
        threshold: u8,
        /// Median filter window used.
        median_window: u32,
        /// Pixels kept as foreground after filtering.
        foreground_pixel_count: u64,
        /// Total pixel count, for computing coverage.
        total_pixel_count: u64,
    },
    /// Color classification metrics.
    Classification {
        /// One entry per label, in palette order.
        colors: Vec<ColorMetrics>,
    },
    /// Ordering metrics.
    Ordering {
        /// The inferred left-to-right sequence.
        detected: Vec<ColorLabel>,
    },
    /// Scoring metrics.
    Scoring {
        correct: usize,
        wrong: usize,
        missing: usize,
        accuracy: f64,
    },
}

/// High-level summary of an analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Frame width in pixels.
    pub image_width: u32,
    /// Frame height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Number of colors located.
    pub detected_count: usize,
    /// Final accuracy percentage.
    pub accuracy: f64,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Analysis Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Foreground", &self.foreground),
            ("Classification", &self.classification),
            ("Ordering", &self.ordering),
            ("Scoring", &self.scoring),
        ];

        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Colors detected: {}  |  Accuracy: {:.2}%",
            self.summary.detected_count, self.summary.accuracy,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Foreground {
            threshold,
            median_window,
            foreground_pixel_count,
            total_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let coverage = if *total_pixel_count > 0 {
                *foreground_pixel_count as f64 / *total_pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!(
                "threshold={threshold} window={median_window} fg={foreground_pixel_count} ({coverage:.1}%)",
            )
        }
        StageMetrics::Classification { colors } => colors
            .iter()
            .map(|c| match c.position {
                Some(p) => format!(
                    "{}: {} regions @({},{})",
                    c.label, c.region_count, p.x, p.y
                ),
                None => format!("{}: none", c.label),
            })
            .collect::<Vec<_>>()
            .join(", "),
        StageMetrics::Ordering { detected } => crate::target::format_sequence(detected),
        StageMetrics::Scoring {
            correct,
            wrong,
            missing,
            accuracy,
        } => format!("correct={correct} wrong={wrong} missing={missing} accuracy={accuracy:.2}%"),
    }
}
