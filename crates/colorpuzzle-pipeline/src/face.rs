//! Identity check between a registered face crop and a live one.
//!
//! [`FaceMatcher`] is the seam: the puzzle pipeline only consumes the
//! boolean it returns, so a real recognition model can replace
//! [`MseFaceMatcher`] without touching scoring. Locating the face inside
//! a frame is left to the caller.

use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};

use crate::types::{GrayImage, PipelineConfig};

/// Side length crops are resized to before comparison.
pub const FACE_SIZE: u32 = 200;

/// Whether a face matched the registered reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IdentityStatus {
    Matched,
    #[default]
    Mismatch,
}

impl IdentityStatus {
    #[must_use]
    pub const fn from_matched(matched: bool) -> Self {
        if matched { Self::Matched } else { Self::Mismatch }
    }

    #[must_use]
    pub const fn is_matched(self) -> bool {
        matches!(self, Self::Matched)
    }
}

impl std::fmt::Display for IdentityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Matched => "Matched",
            Self::Mismatch => "Mismatch",
        })
    }
}

/// Compares a reference face crop against a candidate.
pub trait FaceMatcher {
    /// Returns `true` if both crops show the same person.
    fn matches(&self, reference: &GrayImage, candidate: &GrayImage) -> bool;
}

/// Whole-image mean squared error comparison.
///
/// This is not face recognition: it only says two crops look alike
/// pixel-for-pixel. Both crops are first resized to
/// [`FACE_SIZE`] x [`FACE_SIZE`], so crops of the same face taken at
/// different distances are comparable. Empty crops never match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MseFaceMatcher {
    /// Crops match when their MSE is strictly below this value.
    pub max_mse: f64,
}

impl MseFaceMatcher {
    #[must_use]
    pub const fn new(max_mse: f64) -> Self {
        Self { max_mse }
    }

    #[must_use]
    pub const fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.face_max_mse)
    }
}

impl Default for MseFaceMatcher {
    fn default() -> Self {
        Self::new(PipelineConfig::DEFAULT_FACE_MAX_MSE)
    }
}

impl FaceMatcher for MseFaceMatcher {
    fn matches(&self, reference: &GrayImage, candidate: &GrayImage) -> bool {
        if reference.is_empty() || candidate.is_empty() {
            return false;
        }
        match mean_squared_error(&normalize_face(reference), &normalize_face(candidate)) {
            Some(mse) => {
                tracing::debug!(mse, max_mse = self.max_mse, "compared face crops");
                mse < self.max_mse
            }
            None => false,
        }
    }
}

/// Resize a face crop to [`FACE_SIZE`] square with bilinear filtering.
///
/// Crops already at that size are returned unchanged.
#[must_use = "returns the resized crop"]
pub fn normalize_face(face: &GrayImage) -> GrayImage {
    if face.dimensions() == (FACE_SIZE, FACE_SIZE) {
        return face.clone();
    }
    imageops::resize(face, FACE_SIZE, FACE_SIZE, FilterType::Triangle)
}

/// Mean squared error between two same-sized grayscale images.
///
/// Returns `None` if the sizes differ or the images are empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean_squared_error(a: &GrayImage, b: &GrayImage) -> Option<f64> {
    if a.dimensions() != b.dimensions() || a.is_empty() {
        return None;
    }
    let sum: f64 = a
        .pixels()
        .zip(b.pixels())
        .map(|(p, q)| {
            let d = f64::from(p.0[0]) - f64::from(q.0[0]);
            d * d
        })
        .sum();
    Some(sum / a.pixels().len() as f64)
}
