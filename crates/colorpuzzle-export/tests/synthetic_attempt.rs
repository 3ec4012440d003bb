//! Integration test: score a synthetic attempt end to end and export the report.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;

use colorpuzzle_export::{ReportData, ReportMetadata};
use colorpuzzle_pipeline::{
    ColorLabel, IdentityStatus, PipelineConfig, RgbImage, Session, TargetSequence,
};

/// A grey table with colored cards placed at the given x offsets.
fn table(cards: &[([u8; 3], u32)]) -> RgbImage {
    let mut frame = RgbImage::from_pixel(160, 60, image::Rgb([128, 128, 128]));
    for &(color, x0) in cards {
        for y in 20..40 {
            for x in x0..x0 + 20 {
                frame.put_pixel(x, y, image::Rgb(color));
            }
        }
    }
    frame
}

fn encode_png(frame: &RgbImage) -> Vec<u8> {
    let mut buf = Vec::new();
    frame
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn synthetic_attempt_to_report() {
    let red = [230, 30, 30];
    let green = [30, 210, 40];
    let blue = [30, 40, 230];

    // Round-trip through PNG so decoding is covered as well.
    let background = colorpuzzle_pipeline::decode_frame(&encode_png(&table(&[]))).unwrap();
    let snapshot = colorpuzzle_pipeline::decode_frame(&encode_png(&table(&[
        (green, 10),
        (red, 70),
        (blue, 125),
    ])))
    .unwrap();

    let target: TargetSequence = "green,blue,red".parse().unwrap();
    let session = Session::new(target)
        .with_background(background)
        .with_snapshot(snapshot)
        .with_identity(IdentityStatus::Matched);

    let analysis = session
        .analyze(&PipelineConfig::default())
        .expect("pipeline should succeed");
    eprintln!(
        "Detected {:?} in {} frame",
        analysis.detected, analysis.dimensions
    );
    assert_eq!(
        analysis.detected,
        vec![ColorLabel::Green, ColorLabel::Red, ColorLabel::Blue]
    );
    assert_eq!(analysis.score.correct, 1);
    assert!((analysis.score.accuracy - 33.33).abs() < 1e-9);

    let report = ReportData::from_analysis(
        &analysis,
        session.target(),
        session.identity(),
        ReportMetadata {
            child_name: Some("Riya"),
            location: Some("Pune"),
        },
    );

    let text = report.to_text();
    assert!(text.contains("Target Order: Green → Blue → Red"));
    assert!(text.contains("Detected Order: Green → Red → Blue"));
    assert!(text.contains("Accuracy: 33.33%"));
    assert!(text.contains("Identity: Matched"));

    let json = report.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["correct"], 1);
    assert_eq!(value["target"], serde_json::json!(["Green", "Blue", "Red"]));

    // Write the report so it can be inspected after a test run.
    let workspace_root = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf();
    let target_dir = workspace_root.join("target");
    if target_dir.is_dir() {
        let output_path = target_dir.join("synthetic-attempt-report.json");
        std::fs::write(&output_path, &json).unwrap();
        eprintln!("Report written to {output_path:?} ({} bytes)", json.len());
    }
}
