//! Color classification by fixed HSV thresholds.
//!
//! For each [`ColorLabel`] the frame is thresholded against that label's
//! [`HsvRange`], the outer borders of the resulting blobs are traced with
//! `imageproc::contours::find_contours`, and the largest blob (by polygon
//! area) gives the label's position: the center of its bounding box.
//!
//! Overlapping ranges may let two labels claim the same pixels. That is a
//! known limitation of fixed thresholds and is not corrected here.

use image::{GrayImage, Luma};
use imageproc::contours::{BorderType, Contour};

use crate::hsv::{Hsv, HsvRange, to_hsv_image};
use crate::types::{ChannelOrder, ColorLabel, ColorRanges, DetectionResult, Position, RgbImage};

/// Axis-aligned bounding box of a region, in whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    /// Width including both edge columns, so a single pixel is 1 wide.
    pub width: u32,
    /// Height including both edge rows.
    pub height: u32,
}

impl BoundingBox {
    /// Center of the box, rounded toward the top-left.
    #[must_use]
    pub const fn center(&self) -> Position {
        Position::new(self.x + self.width / 2, self.y + self.height / 2)
    }
}

/// One connected blob of a color mask.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Area enclosed by the traced border (shoelace formula).
    ///
    /// Blobs one pixel thick enclose no area and report zero.
    pub area: f64,
    pub bounds: BoundingBox,
}

/// Result of scanning a frame for a single color.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScan {
    pub label: ColorLabel,
    /// Number of outer regions found for this color.
    pub region_count: usize,
    /// Pixels that fell inside the color's range.
    pub matched_pixels: u64,
    /// The largest region, if any region was found.
    pub largest: Option<Region>,
}

/// Threshold an HSV image against `range`: 255 inside, 0 outside.
#[must_use = "returns the binary color mask"]
pub fn color_mask(hsv: &RgbImage, range: HsvRange) -> GrayImage {
    GrayImage::from_fn(hsv.width(), hsv.height(), |x, y| {
        let [h, s, v] = hsv.get_pixel(x, y).0;
        if range.contains(Hsv::new(h, s, v)) {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Polygon area of a traced contour.
#[must_use]
pub fn contour_area(contour: &Contour<u32>) -> f64 {
    let points = &contour.points;
    if points.len() < 3 {
        return 0.0;
    }
    let twice_area: f64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| {
            f64::from(a.x).mul_add(f64::from(b.y), -(f64::from(b.x) * f64::from(a.y)))
        })
        .sum();
    twice_area.abs() / 2.0
}

/// Bounding box of a traced contour, or `None` for an empty contour.
#[must_use]
pub fn bounding_box(contour: &Contour<u32>) -> Option<BoundingBox> {
    let first = contour.points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &contour.points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(BoundingBox {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    })
}

/// Copy `mask` into a frame one pixel larger on every side.
///
/// Contour tracing mislabels blobs that touch the image border, so the
/// mask is traced with a background margin and the coordinates shifted
/// back afterwards.
fn pad_mask(mask: &GrayImage) -> GrayImage {
    let mut padded = GrayImage::new(mask.width() + 2, mask.height() + 2);
    image::imageops::replace(&mut padded, mask, 1, 1);
    padded
}

/// Outer regions of a binary mask, in raster scan order.
///
/// Holes and blobs nested inside holes are skipped; only borders with no
/// enclosing contour are returned. Blobs touching the frame edge are
/// found like any other.
#[must_use]
pub fn external_regions(mask: &GrayImage) -> Vec<Region> {
    imageproc::contours::find_contours::<u32>(&pad_mask(mask))
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|c| {
            bounding_box(c).map(|padded| Region {
                area: contour_area(c),
                bounds: BoundingBox {
                    x: padded.x.saturating_sub(1),
                    y: padded.y.saturating_sub(1),
                    ..padded
                },
            })
        })
        .collect()
}

/// The region with the largest area. On ties the earliest region wins.
#[must_use]
pub fn largest_region(regions: Vec<Region>) -> Option<Region> {
    regions.into_iter().reduce(|best, candidate| {
        if candidate.area > best.area {
            candidate
        } else {
            best
        }
    })
}

/// Scan an HSV image for one color.
#[must_use]
pub fn scan_color(hsv: &RgbImage, label: ColorLabel, range: HsvRange) -> ColorScan {
    let mask = color_mask(hsv, range);
    let matched_pixels = mask.pixels().map(|p| u64::from(u8::from(p.0[0] > 0))).sum();
    let regions = external_regions(&mask);
    let region_count = regions.len();
    ColorScan {
        label,
        region_count,
        matched_pixels,
        largest: largest_region(regions),
    }
}

/// Scan a frame for every color label, in [`ColorLabel::ALL`] order.
#[must_use]
pub fn scan_colors(image: &RgbImage, order: ChannelOrder, ranges: &ColorRanges) -> Vec<ColorScan> {
    let hsv = to_hsv_image(image, order);
    ColorLabel::ALL
        .into_iter()
        .map(|label| scan_color(&hsv, label, ranges.get(label)))
        .collect()
}

/// Locate each color in a frame.
///
/// A label is present in the result only if at least one region of that
/// color exists. A frame matching no range yields an empty result.
#[must_use]
pub fn detect_colors(image: &RgbImage, order: ChannelOrder, ranges: &ColorRanges) -> DetectionResult {
    detection_from_scans(&scan_colors(image, order, ranges))
}

/// Collapse per-color scans into a [`DetectionResult`].
#[must_use]
pub fn detection_from_scans(scans: &[ColorScan]) -> DetectionResult {
    let mut result = DetectionResult::new();
    for scan in scans {
        if let Some(ref region) = scan.largest {
            let center = region.bounds.center();
            tracing::debug!(
                color = %scan.label,
                regions = scan.region_count,
                x = center.x,
                y = center.y,
                "color located"
            );
            result.insert(scan.label, center);
        }
    }
    result
}
