//! Hue-saturation-value conversion and range tests.
//!
//! Uses the 8-bit convention of common camera toolkits: hue is halved to
//! fit `0..=179`, saturation and value span `0..=255`. Threshold tables
//! written for that convention can therefore be used unchanged.

use serde::{Deserialize, Serialize};

use crate::types::{ChannelOrder, RgbImage};

/// Largest representable hue (degrees halved).
pub const MAX_HUE: u8 = 179;

/// A single HSV sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hsv {
    /// Hue, `0..=179` (degrees / 2).
    pub h: u8,
    /// Saturation, `0..=255`.
    pub s: u8,
    /// Value, `0..=255`.
    pub v: u8,
}

impl Hsv {
    #[must_use]
    pub const fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }
}

/// Inclusive HSV bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvRange {
    pub lower: Hsv,
    pub upper: Hsv,
}

impl HsvRange {
    #[must_use]
    pub const fn new(lower: Hsv, upper: Hsv) -> Self {
        Self { lower, upper }
    }

    /// Whether `hsv` lies within the bounds on all three axes.
    #[must_use]
    pub const fn contains(&self, hsv: Hsv) -> bool {
        hsv.h >= self.lower.h
            && hsv.h <= self.upper.h
            && hsv.s >= self.lower.s
            && hsv.s <= self.upper.s
            && hsv.v >= self.lower.v
            && hsv.v <= self.upper.v
    }

    /// Lower bound does not exceed the upper bound on any axis.
    #[must_use]
    pub const fn is_well_formed(&self) -> bool {
        self.lower.h <= self.upper.h && self.lower.s <= self.upper.s && self.lower.v <= self.upper.v
    }
}

/// Convert one `[r, g, b]` pixel to HSV.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::many_single_char_names
)]
pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> Hsv {
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = f32::from(v - min);

    let s = if v == 0 {
        0
    } else {
        (delta * 255.0 / f32::from(v)).round() as u8
    };

    if delta == 0.0 {
        return Hsv { h: 0, s, v };
    }

    let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
    let mut degrees = if v == r {
        60.0 * (gf - bf) / delta
    } else if v == g {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if degrees < 0.0 {
        degrees += 360.0;
    }

    // Hue is circular: a value rounding up to 180 is the same as 0.
    let h = ((degrees / 2.0).round() as u16 % (u16::from(MAX_HUE) + 1)) as u8;
    Hsv { h, s, v }
}

/// Convert one `[b, g, r]` pixel, as laid out by BGR camera buffers.
#[must_use]
pub fn bgr_to_hsv([b, g, r]: [u8; 3]) -> Hsv {
    rgb_to_hsv([r, g, b])
}

/// Convert every pixel of a frame to HSV.
///
/// The result reuses the three-channel buffer type, with channels holding
/// `(h, s, v)` instead of colors. `order` declares how the input frame's
/// channels are laid out.
#[must_use = "returns the HSV image"]
pub fn to_hsv_image(image: &RgbImage, order: ChannelOrder) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let hsv = rgb_to_hsv(order.to_rgb(image.get_pixel(x, y).0));
        image::Rgb([hsv.h, hsv.s, hsv.v])
    })
}
