//! Positional accuracy scoring.
//!
//! A detected color earns credit only when it sits at the same index as
//! in the target. The right colors in the wrong order therefore score
//! low; this is an ordering puzzle, not a set-membership check.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{ColorLabel, PipelineError};

/// Outcome of comparing a detected order against the target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Detected colors at the same index as in the target.
    pub correct: usize,
    /// Detected colors not at their target index (`detected - correct`).
    pub wrong: usize,
    /// Target slots with no detected color at all.
    pub missing: usize,
    /// Percentage in `[0, 100]`, rounded to two decimals.
    pub accuracy: f64,
}

/// Round to two decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Score `detected` against `target` position by position.
///
/// Only the first `min(detected.len(), target.len())` entries are compared.
/// Extra detected entries count as wrong. An exact element-for-element
/// match always reports `100.0`.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyTarget`] if `target` is empty, since the
/// accuracy would be a division by zero.
#[allow(clippy::cast_precision_loss)]
pub fn score(detected: &[ColorLabel], target: &[ColorLabel]) -> Result<ScoreResult, PipelineError> {
    if target.is_empty() {
        return Err(PipelineError::EmptyTarget);
    }

    let correct = detected
        .iter()
        .zip(target)
        .filter(|(d, t)| d == t)
        .count();
    let wrong = detected.len() - correct;
    let missing = target.len().saturating_sub(detected.len());

    let accuracy = if detected == target {
        100.0
    } else {
        round2(correct as f64 / target.len() as f64 * 100.0)
    };

    tracing::debug!(correct, wrong, missing, accuracy, "scored attempt");
    Ok(ScoreResult {
        correct,
        wrong,
        missing,
        accuracy,
    })
}

/// Encouragement tier for a given accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Feedback {
    /// 90% and above.
    Excellent,
    /// 70% up to 90%.
    Good,
    /// 40% up to 70%.
    Fair,
    /// Below 40%.
    NeedsImprovement,
}

impl Feedback {
    /// Pick the tier for `accuracy` (a percentage).
    #[must_use]
    pub fn from_accuracy(accuracy: f64) -> Self {
        if accuracy >= 90.0 {
            Self::Excellent
        } else if accuracy >= 70.0 {
            Self::Good
        } else if accuracy >= 40.0 {
            Self::Fair
        } else {
            Self::NeedsImprovement
        }
    }

    /// Message shown to the child.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent performance!",
            Self::Good => "Good job! Keep practicing.",
            Self::Fair => "Fair attempt. Try again.",
            Self::NeedsImprovement => "Needs improvement. Practice more.",
        }
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
