//! Background subtraction: isolate the puzzle pieces placed after the
//! background frame was captured.
//!
//! The snapshot is compared pixel-by-pixel against the background. Pixels
//! whose difference intensity reaches the threshold become foreground; a
//! median filter then removes isolated specks before the mask is applied
//! to the snapshot.
//!
//! This is the first stage of the pipeline, ahead of color detection.

use image::{GrayImage, Luma};

use crate::types::{ChannelOrder, Dimensions, PipelineError, RgbImage};

/// Mask value for foreground pixels.
pub const FOREGROUND: u8 = 255;

/// Ensure both frames have identical dimensions.
///
/// # Errors
///
/// Returns [`PipelineError::DimensionMismatch`] if the sizes differ. The
/// frames are never cropped or resized to make them fit.
pub fn check_dimensions(
    background: &RgbImage,
    snapshot: &RgbImage,
) -> Result<Dimensions, PipelineError> {
    let background_dims = Dimensions::of(background);
    let snapshot_dims = Dimensions::of(snapshot);
    if background_dims != snapshot_dims {
        return Err(PipelineError::DimensionMismatch {
            background: background_dims,
            snapshot: snapshot_dims,
        });
    }
    Ok(snapshot_dims)
}

/// Luminance of one pixel, using fixed-point weights
/// `0.299 R + 0.587 G + 0.114 B` with rounding.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn luminance([r, g, b]: [u8; 3]) -> u8 {
    const R_WEIGHT: u32 = 4899;
    const G_WEIGHT: u32 = 9617;
    const B_WEIGHT: u32 = 1868;
    const SHIFT: u32 = 14;
    let sum = u32::from(r) * R_WEIGHT + u32::from(g) * G_WEIGHT + u32::from(b) * B_WEIGHT;
    // Weights sum to 1 << SHIFT, so the result never exceeds 255.
    ((sum + (1 << (SHIFT - 1))) >> SHIFT) as u8
}

/// Per-pixel absolute difference of two frames, collapsed to one channel.
///
/// Callers must have checked that the frames share dimensions.
fn difference_intensity(
    background: &RgbImage,
    snapshot: &RgbImage,
    order: ChannelOrder,
) -> GrayImage {
    GrayImage::from_fn(snapshot.width(), snapshot.height(), |x, y| {
        let a = background.get_pixel(x, y).0;
        let b = snapshot.get_pixel(x, y).0;
        let diff = std::array::from_fn(|c| a[c].abs_diff(b[c]));
        Luma([luminance(order.to_rgb(diff))])
    })
}

/// Compute the binary foreground mask (0 or [`FOREGROUND`]).
///
/// A pixel is foreground when its difference intensity is at least
/// `threshold`. `median_window` is the side of the square median filter;
/// a window of 1 leaves the thresholded mask unfiltered.
///
/// # Errors
///
/// Returns [`PipelineError::DimensionMismatch`] if the frames differ in
/// size, or [`PipelineError::InvalidConfig`] if `median_window` is zero
/// or even.
pub fn foreground_mask(
    background: &RgbImage,
    snapshot: &RgbImage,
    order: ChannelOrder,
    threshold: u8,
    median_window: u32,
) -> Result<GrayImage, PipelineError> {
    check_dimensions(background, snapshot)?;
    if median_window == 0 || median_window % 2 == 0 {
        return Err(PipelineError::InvalidConfig(format!(
            "median_window must be odd and at least 1, got {median_window}"
        )));
    }

    let mut mask = difference_intensity(background, snapshot, order);
    for pixel in mask.pixels_mut() {
        pixel.0[0] = if pixel.0[0] >= threshold { FOREGROUND } else { 0 };
    }

    let radius = median_window / 2;
    if radius > 0 {
        mask = imageproc::filter::median_filter(&mask, radius, radius);
    }

    tracing::debug!(
        threshold,
        median_window,
        foreground_pixels = count_foreground(&mask),
        "computed foreground mask"
    );
    Ok(mask)
}

/// Keep only the snapshot pixels marked in `mask`; everything else
/// becomes black.
///
/// Returns a new image; `snapshot` is left untouched.
#[must_use = "returns the masked snapshot"]
pub fn apply_mask(snapshot: &RgbImage, mask: &GrayImage) -> RgbImage {
    RgbImage::from_fn(snapshot.width(), snapshot.height(), |x, y| {
        if mask.get_pixel(x, y).0[0] == FOREGROUND {
            *snapshot.get_pixel(x, y)
        } else {
            image::Rgb([0, 0, 0])
        }
    })
}

/// Isolate the objects that appeared between `background` and `snapshot`.
///
/// # Errors
///
/// See [`foreground_mask`].
pub fn extract_foreground(
    background: &RgbImage,
    snapshot: &RgbImage,
    order: ChannelOrder,
    threshold: u8,
    median_window: u32,
) -> Result<RgbImage, PipelineError> {
    let mask = foreground_mask(background, snapshot, order, threshold, median_window)?;
    Ok(apply_mask(snapshot, &mask))
}

/// Number of foreground pixels in a mask.
pub(crate) fn count_foreground(mask: &GrayImage) -> u64 {
    mask.pixels()
        .map(|p| u64::from(u8::from(p.0[0] == FOREGROUND)))
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Gray background with a solid square of `color` at `x0..x0+size`.
    fn frame_with_square(color: [u8; 3], x0: u32, y0: u32, size: u32) -> RgbImage {
        RgbImage::from_fn(40, 30, |x, y| {
            if (x0..x0 + size).contains(&x) && (y0..y0 + size).contains(&y) {
                image::Rgb(color)
            } else {
                image::Rgb([90, 90, 90])
            }
        })
    }

    #[test]
    fn luminance_of_extremes() {
        assert_eq!(luminance([0, 0, 0]), 0);
        assert_eq!(luminance([255, 255, 255]), 255);
    }

    #[test]
    fn luminance_weights_green_highest() {
        let r = luminance([255, 0, 0]);
        let g = luminance([0, 255, 0]);
        let b = luminance([0, 0, 255]);
        assert_eq!((r, g, b), (76, 150, 29));
    }

    #[test]
    fn identical_frames_produce_empty_mask() {
        let frame = frame_with_square([200, 10, 10], 5, 5, 10);
        let mask = foreground_mask(&frame, &frame, ChannelOrder::Rgb, 40, 5).unwrap();
        assert_eq!(count_foreground(&mask), 0);

        let fg = extract_foreground(&frame, &frame, ChannelOrder::Rgb, 40, 5).unwrap();
        assert!(fg.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn placed_square_becomes_foreground() {
        let background = frame_with_square([90, 90, 90], 0, 0, 0);
        let snapshot = frame_with_square([220, 20, 20], 10, 8, 10);
        let fg = extract_foreground(&background, &snapshot, ChannelOrder::Rgb, 40, 5).unwrap();

        // Interior of the square keeps its color.
        assert_eq!(fg.get_pixel(15, 13).0, [220, 20, 20]);
        // Untouched background is blacked out.
        assert_eq!(fg.get_pixel(2, 2).0, [0, 0, 0]);
        assert_eq!(fg.get_pixel(35, 25).0, [0, 0, 0]);
    }

    #[test]
    fn difference_at_threshold_counts_as_foreground() {
        let background = RgbImage::from_pixel(9, 9, image::Rgb([0, 0, 0]));
        // A uniform difference of exactly 40 on every channel.
        let snapshot = RgbImage::from_pixel(9, 9, image::Rgb([40, 40, 40]));
        let mask = foreground_mask(&background, &snapshot, ChannelOrder::Rgb, 40, 1).unwrap();
        assert_eq!(count_foreground(&mask), 81);

        let below = RgbImage::from_pixel(9, 9, image::Rgb([39, 39, 39]));
        let mask = foreground_mask(&background, &below, ChannelOrder::Rgb, 40, 1).unwrap();
        assert_eq!(count_foreground(&mask), 0);
    }

    #[test]
    fn median_filter_removes_isolated_pixel() {
        let background = RgbImage::from_pixel(15, 15, image::Rgb([0, 0, 0]));
        let mut snapshot = background.clone();
        snapshot.put_pixel(7, 7, image::Rgb([255, 255, 255]));

        let unfiltered = foreground_mask(&background, &snapshot, ChannelOrder::Rgb, 40, 1).unwrap();
        assert_eq!(count_foreground(&unfiltered), 1);

        let filtered = foreground_mask(&background, &snapshot, ChannelOrder::Rgb, 40, 5).unwrap();
        assert_eq!(count_foreground(&filtered), 0);
    }

    #[test]
    fn dimension_mismatch_is_reported() {
        let background = RgbImage::new(100, 100);
        let snapshot = RgbImage::new(200, 200);
        let result = extract_foreground(&background, &snapshot, ChannelOrder::Rgb, 40, 5);
        assert!(matches!(
            result,
            Err(PipelineError::DimensionMismatch { background, snapshot })
                if background.width == 100 && snapshot.width == 200
        ));
    }

    #[test]
    fn even_median_window_is_rejected() {
        let frame = RgbImage::new(4, 4);
        let result = foreground_mask(&frame, &frame, ChannelOrder::Rgb, 40, 4);
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn inputs_are_not_mutated() {
        let background = frame_with_square([90, 90, 90], 0, 0, 0);
        let snapshot = frame_with_square([20, 20, 220], 3, 3, 12);
        let (bg_copy, snap_copy) = (background.clone(), snapshot.clone());
        let _ = extract_foreground(&background, &snapshot, ChannelOrder::Rgb, 40, 5).unwrap();
        assert_eq!(background, bg_copy);
        assert_eq!(snapshot, snap_copy);
    }
}
