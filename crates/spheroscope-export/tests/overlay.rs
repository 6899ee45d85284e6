//! Integration test: analyze a synthetic spheroid and export the overlay to SVG.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;

use image::{GrayImage, Luma};
use spheroscope_engine::{AnalysisSession, Dimensions, EngineConfig, Path, Point, Scale};
use spheroscope_export::{SvgMetadata, to_svg};

/// Bright disc of radius 15 at (60, 60) with two small bright cells.
fn spheroid_scene() -> GrayImage {
    GrayImage::from_fn(120, 120, |x, y| {
        let (fx, fy) = (f64::from(x), f64::from(y));
        let core = (fx - 60.0).hypot(fy - 60.0) <= 15.0;
        let cell = (fx - 95.0).hypot(fy - 60.0) <= 4.0 || (fx - 60.0).hypot(fy - 20.0) <= 4.0;
        Luma([if core || cell { 220 } else { 20 }])
    })
}

#[test]
fn synthetic_spheroid_to_svg() {
    let img = spheroid_scene();
    let mut session = AnalysisSession::new(EngineConfig::default(), Scale::default()).unwrap();

    let wand = session
        .magic_wand(&img, Point::new(60.0, 60.0))
        .expect("core should be selected");
    eprintln!(
        "Core blob {} px, contour {} vertices",
        wand.pixel_count,
        wand.contour.len()
    );

    session.set_halo_point(Point::new(60.0, 85.0)).unwrap();
    session.set_migration_point(Point::new(110.0, 60.0)).unwrap();
    let detected = session.detect_cells(&img);
    eprintln!("Detected {detected} cells");
    assert!(detected >= 1);

    session.confirm_cells();
    session.set_margin_path(
        Path::new(vec![
            Point::new(5.0, 5.0),
            Point::new(115.0, 5.0),
            Point::new(115.0, 115.0),
            Point::new(5.0, 115.0),
        ])
        .closed(),
    );

    let svg = to_svg(
        session.snapshot(),
        Dimensions {
            width: img.width(),
            height: img.height(),
        },
        &SvgMetadata {
            title: Some("synthetic spheroid"),
            description: None,
        },
    );

    assert!(svg.contains("<svg"));
    assert!(svg.contains(r#"id="core""#));
    assert!(svg.contains(r#"id="margin""#));
    assert!(svg.contains(r#"id="radii""#));
    assert_eq!(svg.matches("<ellipse").count(), detected);
    assert!(svg.contains("</svg>"));

    let output_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("target/synthetic-spheroid-overlay.svg");
    if std::fs::write(&output_path, &svg).is_ok() {
        eprintln!("SVG written to {output_path:?} ({} bytes)", svg.len());
    }
}
