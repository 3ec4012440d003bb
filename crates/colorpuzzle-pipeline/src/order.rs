//! Order inference: read the detected colors left to right.

use crate::types::{ColorLabel, DetectionResult};

/// Sort the found colors by ascending x coordinate.
///
/// Colors that were not found are left out entirely. Equal x coordinates
/// keep [`ColorLabel::ALL`] order, but callers should not rely on it.
#[must_use]
pub fn infer_order(detection: &DetectionResult) -> Vec<ColorLabel> {
    let mut found: Vec<_> = detection.found().collect();
    found.sort_by_key(|&(_, position)| position.x);
    let order: Vec<ColorLabel> = found.into_iter().map(|(label, _)| label).collect();
    tracing::debug!(?order, "inferred left-to-right order");
    order
}
