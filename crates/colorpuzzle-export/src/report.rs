//! Per-attempt performance report.
//!
//! [`ReportData`] is a flat record of one scored attempt: who played,
//! where, what was asked for, what the camera saw and how it scored. It
//! serializes to pretty JSON with [`ReportData::to_json`] or to a short
//! text summary with [`ReportData::to_text`].
//!
//! These are pure functions with no I/O; they return `String`s.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use colorpuzzle_pipeline::target::format_sequence;
use colorpuzzle_pipeline::{Analysis, ColorLabel, Feedback, IdentityStatus};

/// Title line of the text report.
const TITLE: &str = "Color Puzzle Performance Report";

/// Errors from report serialization.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// JSON serialization failed.
    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Who played and where.
///
/// Both fields are optional. Missing values are left out of the text
/// report and written as `null` in JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportMetadata<'a> {
    /// Name entered at login.
    pub child_name: Option<&'a str>,
    /// Free-form place of the session, e.g. a school or clinic.
    pub location: Option<&'a str>,
}

/// One scored attempt, ready for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    pub child_name: Option<String>,
    pub location: Option<String>,
    /// Requested order.
    pub target: Vec<ColorLabel>,
    /// Order found in the snapshot, left to right.
    pub detected: Vec<ColorLabel>,
    pub correct: usize,
    pub wrong: usize,
    pub missing: usize,
    /// Percentage, two decimals.
    pub accuracy: f64,
    pub identity: IdentityStatus,
    pub feedback: Feedback,
}

impl ReportData {
    /// Build a report from a finished analysis.
    #[must_use]
    pub fn from_analysis(
        analysis: &Analysis,
        target: &[ColorLabel],
        identity: IdentityStatus,
        metadata: ReportMetadata<'_>,
    ) -> Self {
        Self {
            child_name: metadata.child_name.map(str::to_owned),
            location: metadata.location.map(str::to_owned),
            target: target.to_vec(),
            detected: analysis.detected.clone(),
            correct: analysis.score.correct,
            wrong: analysis.score.wrong,
            missing: analysis.score.missing,
            accuracy: analysis.score.accuracy,
            identity,
            feedback: analysis.feedback,
        }
    }

    /// Serialize as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render a human-readable summary, one `Label: value` line per field.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{TITLE}");
        let _ = writeln!(out, "{}", "=".repeat(TITLE.len()));
        if let Some(name) = &self.child_name {
            let _ = writeln!(out, "Child Name: {name}");
        }
        if let Some(location) = &self.location {
            let _ = writeln!(out, "Location: {location}");
        }
        let _ = writeln!(out, "Identity: {}", self.identity);
        let _ = writeln!(out, "Target Order: {}", format_sequence(&self.target));
        let _ = writeln!(out, "Detected Order: {}", format_sequence(&self.detected));
        let _ = writeln!(out, "Correct: {}", self.correct);
        let _ = writeln!(out, "Wrong: {}", self.wrong);
        let _ = writeln!(out, "Missing: {}", self.missing);
        let _ = writeln!(out, "Accuracy: {:.2}%", self.accuracy);
        let _ = write!(out, "Feedback: {}", self.feedback);
        out
    }
}
