//! The order the child is asked to arrange the pieces in.

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::types::{ColorLabel, PipelineError};

/// A permutation of the full palette.
///
/// Every [`ColorLabel`] appears exactly once. Construct with
/// [`TargetSequence::new`], [`TargetSequence::shuffled`] or by parsing a
/// comma-separated list such as `"red,blue,green"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ColorLabel>", into = "Vec<ColorLabel>")]
pub struct TargetSequence(Vec<ColorLabel>);

impl TargetSequence {
    /// Validate `labels` as a permutation of the palette.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidTarget`] if a label is repeated or
    /// the length differs from the palette size.
    pub fn new(labels: Vec<ColorLabel>) -> Result<Self, PipelineError> {
        if labels.len() != ColorLabel::COUNT {
            return Err(PipelineError::InvalidTarget(format!(
                "expected {} colors, got {}",
                ColorLabel::COUNT,
                labels.len()
            )));
        }
        let mut seen = [false; ColorLabel::COUNT];
        for label in &labels {
            if std::mem::replace(&mut seen[label.index()], true) {
                return Err(PipelineError::InvalidTarget(format!(
                    "{label} appears more than once"
                )));
            }
        }
        Ok(Self(labels))
    }

    /// A uniformly random permutation of the palette.
    #[must_use]
    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut labels = ColorLabel::ALL.to_vec();
        labels.shuffle(rng);
        Self(labels)
    }

    /// The labels in target order.
    #[must_use]
    pub fn as_slice(&self) -> &[ColorLabel] {
        &self.0
    }
}

impl Default for TargetSequence {
    /// The palette in its natural order.
    fn default() -> Self {
        Self(ColorLabel::ALL.to_vec())
    }
}

impl Deref for TargetSequence {
    type Target = [ColorLabel];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<Vec<ColorLabel>> for TargetSequence {
    type Error = PipelineError;

    fn try_from(labels: Vec<ColorLabel>) -> Result<Self, Self::Error> {
        Self::new(labels)
    }
}

impl From<TargetSequence> for Vec<ColorLabel> {
    fn from(target: TargetSequence) -> Self {
        target.0
    }
}

impl FromStr for TargetSequence {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let labels = s
            .split(',')
            .map(str::parse)
            .collect::<Result<Vec<ColorLabel>, _>>()?;
        Self::new(labels)
    }
}

impl fmt::Display for TargetSequence {
    /// Arrow-separated, e.g. `Red → Blue → Green`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_sequence(&self.0))
    }
}

/// Join labels with arrows, or `"none"` for an empty sequence.
#[must_use]
pub fn format_sequence(labels: &[ColorLabel]) -> String {
    if labels.is_empty() {
        return "none".to_string();
    }
    labels
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" → ")
}
