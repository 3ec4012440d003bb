//! Shared types for the colorpuzzle scoring pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::hsv::{Hsv, HsvRange};

/// Re-export `GrayImage` so downstream crates can reference masks and
/// face crops without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can pass camera frames
/// without depending on `image` directly.
pub use image::RgbImage;

/// One of the fixed puzzle colors.
///
/// The label set is closed: targets, detections and HSV tables all share
/// these three variants and nothing can be registered at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ColorLabel {
    Red,
    Blue,
    Green,
}

impl ColorLabel {
    /// Every label, in the order the classifier scans them.
    ///
    /// This order also breaks ties when two detections share an x
    /// coordinate.
    pub const ALL: [Self; 3] = [Self::Red, Self::Blue, Self::Green];

    /// Size of the palette.
    pub const COUNT: usize = Self::ALL.len();

    /// Position of this label within [`Self::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Red => 0,
            Self::Blue => 1,
            Self::Green => 2,
        }
    }

    /// Human-readable name, capitalized.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Red => "Red",
            Self::Blue => "Blue",
            Self::Green => "Green",
        }
    }
}

impl fmt::Display for ColorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorLabel {
    type Err = PipelineError;

    /// Parse a label name, ignoring ASCII case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|label| label.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| PipelineError::InvalidTarget(format!("unknown color '{trimmed}'")))
    }
}

/// A pixel position in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal position (pixels from left edge).
    pub x: u32,
    /// Vertical position (pixels from top edge).
    pub y: u32,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an image buffer.
    #[must_use]
    pub fn of<P: image::Pixel>(image: &image::ImageBuffer<P, Vec<P::Subpixel>>) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// How the three channels of an incoming frame are laid out.
///
/// Decoded image files are always RGB. Raw camera buffers frequently
/// arrive as BGR and must be declared as such, otherwise red and blue
/// swap during HSV conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

impl ChannelOrder {
    /// Reorder a raw pixel into `[r, g, b]`.
    #[must_use]
    pub const fn to_rgb(self, pixel: [u8; 3]) -> [u8; 3] {
        match self {
            Self::Rgb => pixel,
            Self::Bgr => [pixel[2], pixel[1], pixel[0]],
        }
    }
}

/// Per-label HSV bounds used by the color classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRanges {
    pub red: HsvRange,
    pub blue: HsvRange,
    pub green: HsvRange,
}

impl ColorRanges {
    /// The range configured for `label`.
    #[must_use]
    pub const fn get(&self, label: ColorLabel) -> HsvRange {
        match label {
            ColorLabel::Red => self.red,
            ColorLabel::Blue => self.blue,
            ColorLabel::Green => self.green,
        }
    }
}

impl Default for ColorRanges {
    fn default() -> Self {
        Self {
            red: HsvRange::new(Hsv::new(0, 120, 70), Hsv::new(10, 255, 255)),
            blue: HsvRange::new(Hsv::new(94, 80, 2), Hsv::new(126, 255, 255)),
            green: HsvRange::new(Hsv::new(40, 40, 40), Hsv::new(70, 255, 255)),
        }
    }
}

/// Configuration for the scoring pipeline.
///
/// Every field has a documented default; the associated constants let
/// front ends share those defaults instead of repeating literals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Channel layout of incoming frames.
    pub channel_order: ChannelOrder,

    /// Minimum per-pixel intensity difference (0-255) for a pixel to
    /// count as foreground. Pixels at or above this value are kept.
    pub diff_threshold: u8,

    /// Side length of the square median filter applied to the
    /// foreground mask. Must be odd and at least 1; 1 disables filtering.
    pub median_window: u32,

    /// HSV bounds for each color label.
    pub color_ranges: ColorRanges,

    /// Mean squared error below which two face crops are considered the
    /// same person.
    pub face_max_mse: f64,
}

impl PipelineConfig {
    /// Default channel layout.
    pub const DEFAULT_CHANNEL_ORDER: ChannelOrder = ChannelOrder::Rgb;
    /// Default foreground difference threshold.
    pub const DEFAULT_DIFF_THRESHOLD: u8 = 40;
    /// Default median filter window.
    pub const DEFAULT_MEDIAN_WINDOW: u32 = 5;
    /// Default face match tolerance (a mean absolute error of ~40 levels).
    pub const DEFAULT_FACE_MAX_MSE: f64 = 1600.0;

    /// Check the configuration for values the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `median_window` is zero
    /// or even, any HSV range has a lower bound above its upper bound, or
    /// `face_max_mse` is negative or not finite.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.median_window == 0 || self.median_window % 2 == 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "median_window must be odd and at least 1, got {}",
                self.median_window
            )));
        }
        for label in ColorLabel::ALL {
            let range = self.color_ranges.get(label);
            if !range.is_well_formed() {
                return Err(PipelineError::InvalidConfig(format!(
                    "{label} range has a lower bound above its upper bound"
                )));
            }
        }
        if !self.face_max_mse.is_finite() || self.face_max_mse < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "face_max_mse must be finite and non-negative, got {}",
                self.face_max_mse
            )));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_order: Self::DEFAULT_CHANNEL_ORDER,
            diff_threshold: Self::DEFAULT_DIFF_THRESHOLD,
            median_window: Self::DEFAULT_MEDIAN_WINDOW,
            color_ranges: ColorRanges::default(),
            face_max_mse: Self::DEFAULT_FACE_MAX_MSE,
        }
    }
}

/// Where each color was found, if anywhere.
///
/// Holds at most one position per label: the bounding-box center of the
/// largest region of that color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DetectionResult([Option<Position>; ColorLabel::COUNT]);

impl DetectionResult {
    /// An empty result with no colors found.
    #[must_use]
    pub const fn new() -> Self {
        Self([None; ColorLabel::COUNT])
    }

    /// Record the position for `label`, replacing any previous value.
    pub const fn insert(&mut self, label: ColorLabel, position: Position) {
        self.0[label.index()] = Some(position);
    }

    /// The position recorded for `label`.
    #[must_use]
    pub const fn get(&self, label: ColorLabel) -> Option<Position> {
        self.0[label.index()]
    }

    /// Every label with its optional position, in [`ColorLabel::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (ColorLabel, Option<Position>)> + '_ {
        ColorLabel::ALL.into_iter().map(|label| (label, self.get(label)))
    }

    /// Only the labels that were found, in [`ColorLabel::ALL`] order.
    pub fn found(&self) -> impl Iterator<Item = (ColorLabel, Position)> + '_ {
        self.iter()
            .filter_map(|(label, position)| position.map(|p| (label, p)))
    }

    /// Number of labels that were found.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.iter().filter(|p| p.is_some()).count()
    }

    /// Returns `true` if no color was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }
}

/// Errors that can occur while analysing a puzzle snapshot.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. The `ImageDecode` variant is
/// serialized as its `Display` string.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Background and snapshot frames have different sizes.
    #[error("background is {background} but snapshot is {snapshot}")]
    DimensionMismatch {
        background: Dimensions,
        snapshot: Dimensions,
    },

    /// The target sequence has no entries, so accuracy is undefined.
    #[error("target sequence is empty")]
    EmptyTarget,

    /// The target sequence is not a permutation of the palette.
    #[error("invalid target sequence: {0}")]
    InvalidTarget(String),

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// Analysis was requested before a background frame was saved.
    #[error("no background frame has been saved")]
    MissingBackground,

    /// Analysis was requested before a snapshot was captured.
    #[error("no snapshot has been captured")]
    MissingSnapshot,

    /// Failed to decode an input frame.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,
}

/// Serde-compatible proxy for `PipelineError`.
#[derive(Serialize, Deserialize)]
enum PipelineErrorProxy {
    DimensionMismatch {
        background: Dimensions,
        snapshot: Dimensions,
    },
    EmptyTarget,
    InvalidTarget(String),
    InvalidConfig(String),
    MissingBackground,
    MissingSnapshot,
    ImageDecode(String),
    EmptyInput,
}

impl Serialize for PipelineError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::DimensionMismatch {
                background,
                snapshot,
            } => PipelineErrorProxy::DimensionMismatch {
                background: *background,
                snapshot: *snapshot,
            },
            Self::EmptyTarget => PipelineErrorProxy::EmptyTarget,
            Self::InvalidTarget(s) => PipelineErrorProxy::InvalidTarget(s.clone()),
            Self::InvalidConfig(s) => PipelineErrorProxy::InvalidConfig(s.clone()),
            Self::MissingBackground => PipelineErrorProxy::MissingBackground,
            Self::MissingSnapshot => PipelineErrorProxy::MissingSnapshot,
            Self::ImageDecode(e) => PipelineErrorProxy::ImageDecode(e.to_string()),
            Self::EmptyInput => PipelineErrorProxy::EmptyInput,
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PipelineError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = PipelineErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            PipelineErrorProxy::DimensionMismatch {
                background,
                snapshot,
            } => Self::DimensionMismatch {
                background,
                snapshot,
            },
            PipelineErrorProxy::EmptyTarget => Self::EmptyTarget,
            PipelineErrorProxy::InvalidTarget(s) => Self::InvalidTarget(s),
            PipelineErrorProxy::InvalidConfig(s) => Self::InvalidConfig(s),
            PipelineErrorProxy::MissingBackground => Self::MissingBackground,
            PipelineErrorProxy::MissingSnapshot => Self::MissingSnapshot,
            // The typed image error cannot be rebuilt; keep its message.
            PipelineErrorProxy::ImageDecode(msg) => {
                Self::InvalidConfig(format!("image decode error: {msg}"))
            }
            PipelineErrorProxy::EmptyInput => Self::EmptyInput,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- ColorLabel tests ---

    #[test]
    fn label_indices_follow_all_order() {
        for (i, label) in ColorLabel::ALL.into_iter().enumerate() {
            assert_eq!(label.index(), i);
        }
    }

    #[test]
    fn label_parses_case_insensitively() {
        assert_eq!("red".parse::<ColorLabel>().unwrap(), ColorLabel::Red);
        assert_eq!(" BLUE ".parse::<ColorLabel>().unwrap(), ColorLabel::Blue);
        assert_eq!("Green".parse::<ColorLabel>().unwrap(), ColorLabel::Green);
    }

    #[test]
    fn unknown_label_is_rejected() {
        let err = "purple".parse::<ColorLabel>().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTarget(ref s) if s.contains("purple")));
    }

    // --- ChannelOrder tests ---

    #[test]
    fn bgr_pixels_are_reordered() {
        assert_eq!(ChannelOrder::Bgr.to_rgb([1, 2, 3]), [3, 2, 1]);
        assert_eq!(ChannelOrder::Rgb.to_rgb([1, 2, 3]), [1, 2, 3]);
    }

    // --- DetectionResult tests ---

    #[test]
    fn detection_result_starts_empty() {
        let result = DetectionResult::new();
        assert!(result.is_empty());
        assert_eq!(result.len(), 0);
        assert_eq!(result.found().count(), 0);
        assert_eq!(result.iter().count(), ColorLabel::COUNT);
    }

    #[test]
    fn detection_result_insert_and_get() {
        let mut result = DetectionResult::new();
        result.insert(ColorLabel::Blue, Position::new(4, 5));
        assert_eq!(result.get(ColorLabel::Blue), Some(Position::new(4, 5)));
        assert_eq!(result.get(ColorLabel::Red), None);
        assert_eq!(result.len(), 1);
        assert!(!result.is_empty());

        // A second insert replaces the first.
        result.insert(ColorLabel::Blue, Position::new(9, 9));
        assert_eq!(result.get(ColorLabel::Blue), Some(Position::new(9, 9)));
        assert_eq!(result.len(), 1);
    }

    // --- PipelineConfig tests ---

    #[test]
    fn pipeline_config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.channel_order, ChannelOrder::Rgb);
        assert_eq!(config.diff_threshold, 40);
        assert_eq!(config.median_window, 5);
        assert_eq!(
            config.color_ranges.red,
            HsvRange::new(Hsv::new(0, 120, 70), Hsv::new(10, 255, 255)),
        );
        assert!((config.face_max_mse - 1600.0).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn even_median_window_is_invalid() {
        let config = PipelineConfig {
            median_window: 4,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn zero_median_window_is_invalid() {
        let config = PipelineConfig {
            median_window: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn inverted_hsv_range_is_invalid() {
        let mut config = PipelineConfig::default();
        config.color_ranges.green = HsvRange::new(Hsv::new(70, 40, 40), Hsv::new(40, 255, 255));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Green"));
    }

    #[test]
    fn negative_face_tolerance_is_invalid() {
        let config = PipelineConfig {
            face_max_mse: -1.0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_config_json_fills_defaults() {
        let config: PipelineConfig = serde_json::from_str(r#"{"diff_threshold": 25}"#).unwrap();
        assert_eq!(config.diff_threshold, 25);
        assert_eq!(config.median_window, PipelineConfig::DEFAULT_MEDIAN_WINDOW);
    }

    #[test]
    fn pipeline_config_serde_round_trip() {
        let config = PipelineConfig {
            channel_order: ChannelOrder::Bgr,
            diff_threshold: 12,
            median_window: 3,
            ..PipelineConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    // --- PipelineError tests ---

    #[test]
    fn error_dimension_mismatch_display() {
        let err = PipelineError::DimensionMismatch {
            background: Dimensions {
                width: 100,
                height: 100,
            },
            snapshot: Dimensions {
                width: 200,
                height: 200,
            },
        };
        assert_eq!(
            err.to_string(),
            "background is 100x100 but snapshot is 200x200"
        );
    }

    #[test]
    fn error_empty_target_display() {
        assert_eq!(
            PipelineError::EmptyTarget.to_string(),
            "target sequence is empty"
        );
    }

    #[test]
    fn pipeline_error_serde_round_trip_dimension_mismatch() {
        let err = PipelineError::DimensionMismatch {
            background: Dimensions {
                width: 1,
                height: 2,
            },
            snapshot: Dimensions {
                width: 3,
                height: 4,
            },
        };
        let json = serde_json::to_string(&err).unwrap();
        let deserialized: PipelineError = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            deserialized,
            PipelineError::DimensionMismatch { background, snapshot }
                if background.width == 1 && snapshot.height == 4
        ));
    }

    #[test]
    fn pipeline_error_serde_round_trip_empty_target() {
        let json = serde_json::to_string(&PipelineError::EmptyTarget).unwrap();
        let deserialized: PipelineError = serde_json::from_str(&json).unwrap();
        assert!(matches!(deserialized, PipelineError::EmptyTarget));
    }
}
