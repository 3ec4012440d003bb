//! Result overlay: mark the pieces that are in the right place.

use image::Rgb;
use imageproc::rect::Rect;

use crate::order::infer_order;
use crate::types::{ChannelOrder, ColorLabel, DetectionResult, RgbImage};

/// Side length of the square drawn around a correct piece.
pub const BOX_SIZE: u32 = 100;

/// Stroke width of the square.
pub const BOX_THICKNESS: u32 = 3;

/// Color of the square, as `[r, g, b]`.
pub const BOX_COLOR: [u8; 3] = [0, 255, 0];

/// Draw a green square around every detected color that sits at its
/// target index.
///
/// `order` is the channel layout of `snapshot`; the box color is written
/// in the same layout. Returns a new image.
#[must_use = "returns the annotated image"]
pub fn annotate(
    snapshot: &RgbImage,
    detection: &DetectionResult,
    target: &[ColorLabel],
    order: ChannelOrder,
) -> RgbImage {
    annotate_with_color(snapshot, detection, target, order, BOX_COLOR)
}

/// Like [`annotate`], with the box color given as `[r, g, b]`.
#[must_use = "returns the annotated image"]
pub fn annotate_with_color(
    snapshot: &RgbImage,
    detection: &DetectionResult,
    target: &[ColorLabel],
    order: ChannelOrder,
    color: [u8; 3],
) -> RgbImage {
    let mut canvas = snapshot.clone();
    let stroke = Rgb(order.to_rgb(color));

    for (index, label) in infer_order(detection).into_iter().enumerate() {
        if target.get(index) != Some(&label) {
            continue;
        }
        let Some(center) = detection.get(label) else {
            continue;
        };
        for inset in 0..BOX_THICKNESS {
            let size = BOX_SIZE - 2 * inset;
            let half = i64::from(size / 2);
            let (Ok(left), Ok(top)) = (
                i32::try_from(i64::from(center.x) - half),
                i32::try_from(i64::from(center.y) - half),
            ) else {
                continue;
            };
            imageproc::drawing::draw_hollow_rect_mut(
                &mut canvas,
                Rect::at(left, top).of_size(size, size),
                stroke,
            );
        }
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;

    fn detection() -> DetectionResult {
        let mut result = DetectionResult::new();
        result.insert(ColorLabel::Red, Position::new(60, 60));
        result.insert(ColorLabel::Blue, Position::new(200, 60));
        result
    }

    #[test]
    fn correct_piece_gets_a_box() {
        let snapshot = RgbImage::new(300, 150);
        let target = [ColorLabel::Red, ColorLabel::Green, ColorLabel::Blue];
        let annotated = annotate(&snapshot, &detection(), &target, ChannelOrder::Rgb);

        // Red is first and expected first: box edge at x = 60 - 50.
        assert_eq!(annotated.get_pixel(10, 60).0, [0, 255, 0]);
        // Blue is second but expected third: no box.
        assert_eq!(annotated.get_pixel(150, 60).0, [0, 0, 0]);
        // Box interior is untouched.
        assert_eq!(annotated.get_pixel(60, 60).0, [0, 0, 0]);
    }

    #[test]
    fn bgr_canvas_gets_color_in_bgr_layout() {
        let snapshot = RgbImage::new(300, 150);
        let target = [ColorLabel::Red, ColorLabel::Blue, ColorLabel::Green];
        let orange = [255, 128, 0];

        let bgr = annotate_with_color(&snapshot, &detection(), &target, ChannelOrder::Bgr, orange);
        assert_eq!(bgr.get_pixel(10, 60).0, [0, 128, 255]);
        assert_eq!(bgr.get_pixel(150, 60).0, [0, 128, 255]);

        let rgb = annotate_with_color(&snapshot, &detection(), &target, ChannelOrder::Rgb, orange);
        assert_eq!(rgb.get_pixel(10, 60).0, orange);
    }

    #[test]
    fn snapshot_is_not_mutated() {
        let snapshot = RgbImage::new(300, 150);
        let target = [ColorLabel::Red, ColorLabel::Blue, ColorLabel::Green];
        let _ = annotate(&snapshot, &detection(), &target, ChannelOrder::Rgb);
        assert!(snapshot.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn box_near_edge_is_clipped() {
        let snapshot = RgbImage::new(80, 80);
        let mut result = DetectionResult::new();
        result.insert(ColorLabel::Red, Position::new(5, 5));
        let annotated = annotate(&snapshot, &result, &[ColorLabel::Red], ChannelOrder::Rgb);
        assert_eq!(annotated.dimensions(), (80, 80));

        // Left and top edges fall outside the frame; the three right and
        // bottom strokes sit at 52, 53 and 54.
        for edge in 52..=54 {
            assert_eq!(annotated.get_pixel(edge, 20).0, BOX_COLOR, "right stroke {edge}");
            assert_eq!(annotated.get_pixel(20, edge).0, BOX_COLOR, "bottom stroke {edge}");
        }
        assert_eq!(annotated.get_pixel(51, 20).0, [0, 0, 0]);
        assert_eq!(annotated.get_pixel(55, 20).0, [0, 0, 0]);
        assert_eq!(annotated.get_pixel(5, 5).0, [0, 0, 0]);
        assert_eq!(annotated.get_pixel(0, 0).0, [0, 0, 0]);
    }
}
