//! Integration test: run the bench binary on a generated image and read its JSON report.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::process::Command;

use image::{GrayImage, Luma};

/// Bright 30×30 core at (40, 40) and one bright 8×8 cell at (100, 45).
fn write_scene(name: &str) -> std::path::PathBuf {
    let img = GrayImage::from_fn(140, 100, |x, y| {
        let core = (40..70).contains(&x) && (40..70).contains(&y);
        let cell = (100..108).contains(&x) && (45..53).contains(&y);
        Luma([if core || cell { 200 } else { 15 }])
    });
    let path = std::env::temp_dir().join(format!("{name}-{}.png", std::process::id()));
    img.save(&path).unwrap();
    path
}

#[test]
fn json_report_for_generated_image() {
    let image_path = write_scene("spheroscope-bench-cli");
    let output = Command::new(env!("CARGO_BIN_EXE_spheroscope-bench"))
        .arg(&image_path)
        .args(["--seed-x", "55", "--seed-y", "55"])
        .args(["--migration-point", "120,55", "--halo-point", "80,55"])
        .args(["--scale-pixels", "2", "--scale-micrometers", "1"])
        .arg("--detect-cells")
        .arg("--json")
        .output()
        .expect("bench binary should run");
    std::fs::remove_file(&image_path).ok();

    eprintln!("{}", String::from_utf8_lossy(&output.stderr));
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["blob_pixels"], 900);
    assert_eq!(json["width"], 140);
    assert_eq!(json["detected_cells"], 1);
    assert_eq!(json["report"]["cell_count"], 1);
    let radius = json["report"]["core_radius_um"].as_f64().unwrap();
    assert!(radius > 5.0 && radius < 12.0, "core radius {radius}");
    assert!(json["report"]["max_migration_um"].as_f64().unwrap() > 0.0);
    let stages: Vec<&str> = json["timings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["stage"].as_str().unwrap())
        .collect();
    assert_eq!(
        stages,
        ["Decode", "Prepare", "Magic Wand", "Radii", "Cell Detection"]
    );
}

#[test]
fn missing_image_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_spheroscope-bench"))
        .arg("/nonexistent/spheroid.png")
        .output()
        .expect("bench binary should run");
    assert!(!output.status.success());
}
