//! Shape and texture metrics for a closed core contour.
//!
//! Shape metrics come from the contour geometry alone. Texture metrics
//! are computed over the pixels whose centers lie inside the contour:
//! gray-level statistics use the rounded 8-bit gray level, gradients use
//! forward differences of the unrounded luma.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::geometry::{max_pairwise_distance, path_perimeter, point_in_polygon, polygon_area};
use crate::hull::convex_hull;
use crate::pixels::PixelSource;
use crate::types::{Path, Point};

/// Standard deviation below which skewness and kurtosis are reported
/// as 0.
const MOMENT_EPSILON: f64 = 1e-6;

/// Every metric derived from one core contour.
///
/// All values are in pixel units. A result with `centroid == (0, 0)` and
/// all other fields 0 means the contour was too short to measure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MorphologyResult {
    /// Shoelace area of the contour.
    pub area: f64,
    /// Length of the contour.
    pub perimeter: f64,
    /// Largest distance between two contour vertices.
    pub diameter: f64,
    /// `4π·area / convex_perimeter²`.
    pub circularity: f64,
    /// `π·equivalent_diameter / perimeter`.
    pub sphericity: f64,
    /// `4π·area / perimeter²`.
    pub compactness: f64,
    /// `area / convex_area`.
    pub solidity: f64,
    /// `convex_perimeter / perimeter`.
    pub convexity: f64,
    /// Shannon entropy (bits) of the enclosed gray-level histogram.
    pub entropy: f64,
    /// Third central moment over the cubed sample standard deviation.
    pub skewness: f64,
    /// Fourth central moment over the sample standard deviation to the
    /// fourth power.
    pub kurtosis: f64,
    /// Mean enclosed gray level.
    pub mean: f64,
    /// Sample variance of the enclosed gray levels.
    pub variance: f64,
    /// Mean forward-difference gradient magnitude.
    pub mean_gradient: f64,
    /// Population variance of the gradient magnitudes.
    pub variance_gradient: f64,
    /// Mean position of the enclosed pixels.
    pub centroid: Point,
}

/// Pixels whose centers `(x + 0.5, y + 0.5)` lie inside `path`.
///
/// Only the path's bounding box (clipped to the raster) is scanned.
/// Returns an empty set for fewer than 3 points.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn enclosed_pixels(path: &[Point], width: u32, height: u32) -> Vec<(u32, u32)> {
    if path.len() < 3 || width == 0 || height == 0 {
        return Vec::new();
    }
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in path {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
        return Vec::new();
    }

    let clamp_x = |v: f64| v.clamp(0.0, f64::from(width - 1)) as u32;
    let clamp_y = |v: f64| v.clamp(0.0, f64::from(height - 1)) as u32;
    let (x0, x1) = (clamp_x(min_x.floor()), clamp_x(max_x.ceil()));
    let (y0, y1) = (clamp_y(min_y.floor()), clamp_y(max_y.ceil()));

    let mut pixels = Vec::new();
    for y in y0..=y1 {
        for x in x0..=x1 {
            let center = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            if point_in_polygon(center, path) {
                pixels.push((x, y));
            }
        }
    }
    pixels
}

/// Compute the full metric set for a closed contour.
///
/// The convex hull is built from the contour without its closing
/// duplicate and measured as a closed ring. Ratios whose denominator is 0
/// are reported as 0.
///
/// Returns [`MorphologyResult::default`] when the contour has fewer than
/// 3 points.
#[must_use]
#[allow(clippy::similar_names)]
pub fn calculate_morphological_metrics<S: PixelSource + ?Sized>(
    contour: &Path,
    source: &S,
) -> MorphologyResult {
    let path = contour.points();
    if path.len() < 3 {
        return MorphologyResult::default();
    }

    let area = polygon_area(path);
    let perimeter = path_perimeter(path);

    let hull = convex_hull(contour.open_points()).closed();
    let convex_area = polygon_area(hull.points());
    let convex_perimeter = path_perimeter(hull.points());

    let equivalent_diameter = (4.0 * area / PI).sqrt();
    let diameter = max_pairwise_distance(path);

    let ratio = |num: f64, den: f64| if den > 0.0 { num / den } else { 0.0 };
    let circularity = ratio(4.0 * PI * area, convex_perimeter.powi(2));
    let convexity = ratio(convex_perimeter, perimeter);
    let compactness = ratio(4.0 * PI * area, perimeter.powi(2));
    let solidity = ratio(area, convex_area);
    let sphericity = ratio(PI * equivalent_diameter, perimeter);

    let dims = source.dimensions();
    let pixels = enclosed_pixels(path, dims.width, dims.height);
    let texture = texture_metrics(&pixels, source);

    log::debug!(
        "morphology: area {area:.1}, perimeter {perimeter:.1}, {} enclosed pixels",
        pixels.len()
    );

    MorphologyResult {
        area,
        perimeter,
        diameter,
        circularity,
        sphericity,
        compactness,
        solidity,
        convexity,
        entropy: texture.entropy,
        skewness: texture.skewness,
        kurtosis: texture.kurtosis,
        mean: texture.mean,
        variance: texture.variance,
        mean_gradient: texture.mean_gradient,
        variance_gradient: texture.variance_gradient,
        centroid: texture.centroid,
    }
}

#[derive(Debug, Default)]
struct Texture {
    entropy: f64,
    skewness: f64,
    kurtosis: f64,
    mean: f64,
    variance: f64,
    mean_gradient: f64,
    variance_gradient: f64,
    centroid: Point,
}

#[allow(clippy::cast_precision_loss)]
fn texture_metrics<S: PixelSource + ?Sized>(pixels: &[(u32, u32)], source: &S) -> Texture {
    if pixels.is_empty() {
        return Texture::default();
    }
    let n = pixels.len() as f64;

    let (sum_x, sum_y) = pixels.iter().fold((0.0, 0.0), |(sx, sy), &(x, y)| {
        (sx + f64::from(x), sy + f64::from(y))
    });
    let centroid = Point::new(sum_x / n, sum_y / n);

    let values: Vec<u8> = pixels.iter().map(|&(x, y)| source.gray_level(x, y)).collect();
    let mean = values.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
    let variance = if pixels.len() > 1 {
        values
            .iter()
            .map(|&v| (f64::from(v) - mean).powi(2))
            .sum::<f64>()
            / (n - 1.0)
    } else {
        0.0
    };
    let std_dev = variance.sqrt();

    let mut histogram = [0usize; 256];
    for &v in &values {
        histogram[usize::from(v)] += 1;
    }
    let entropy = histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / n;
            -p * p.log2()
        })
        .sum::<f64>();

    // Central moments use the population size while the normalizer is
    // the sample standard deviation.
    let (skewness, kurtosis) = if std_dev > MOMENT_EPSILON {
        let m3 = values
            .iter()
            .map(|&v| (f64::from(v) - mean).powi(3))
            .sum::<f64>()
            / n;
        let m4 = values
            .iter()
            .map(|&v| (f64::from(v) - mean).powi(4))
            .sum::<f64>()
            / n;
        (m3 / std_dev.powi(3), m4 / std_dev.powi(4))
    } else {
        (0.0, 0.0)
    };

    let (mean_gradient, variance_gradient) = gradient_stats(pixels, source);

    Texture {
        entropy,
        skewness,
        kurtosis,
        mean,
        variance,
        mean_gradient,
        variance_gradient,
        centroid,
    }
}

/// Mean and population variance of forward-difference gradient
/// magnitudes over the pixels not on the right or bottom edge.
#[allow(clippy::cast_precision_loss)]
fn gradient_stats<S: PixelSource + ?Sized>(pixels: &[(u32, u32)], source: &S) -> (f64, f64) {
    let dims = source.dimensions();
    let gradients: Vec<f64> = pixels
        .iter()
        .filter(|&&(x, y)| x + 1 < dims.width && y + 1 < dims.height)
        .map(|&(x, y)| {
            let here = source.luma(x, y);
            let gx = source.luma(x + 1, y) - here;
            let gy = source.luma(x, y + 1) - here;
            gx.hypot(gy)
        })
        .collect();

    if gradients.is_empty() {
        return (0.0, 0.0);
    }
    let count = gradients.len() as f64;
    let mean = gradients.iter().sum::<f64>() / count;
    let variance = gradients.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / count;
    (mean, variance)
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma};

    use super::*;

    fn polygon(n: usize, center: Point, radius: f64) -> Path {
        (0..n)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let angle = 2.0 * PI * i as f64 / n as f64;
                center.offset_polar(angle, radius)
            })
            .collect::<Path>()
            .closed()
    }

    fn square_path(x0: f64, side: f64) -> Path {
        Path::new(vec![
            Point::new(x0, x0),
            Point::new(x0 + side, x0),
            Point::new(x0 + side, x0 + side),
            Point::new(x0, x0 + side),
        ])
        .closed()
    }

    #[test]
    fn short_contour_gives_zero_result() {
        let img = GrayImage::new(10, 10);
        let path = Path::new(vec![Point::new(1.0, 1.0), Point::new(5.0, 5.0)]);
        assert_eq!(
            calculate_morphological_metrics(&path, &img),
            MorphologyResult::default()
        );
    }

    #[test]
    fn circle_ratios_are_near_one() {
        let img = GrayImage::from_pixel(120, 120, Luma([128]));
        let path = polygon(64, Point::new(60.0, 60.0), 50.0);
        let m = calculate_morphological_metrics(&path, &img);
        for (name, value) in [
            ("circularity", m.circularity),
            ("compactness", m.compactness),
            ("sphericity", m.sphericity),
            ("solidity", m.solidity),
            ("convexity", m.convexity),
        ] {
            assert!((value - 1.0).abs() < 0.02, "{name} = {value}");
        }
        assert!((m.diameter - 100.0).abs() < 1e-9);
    }

    #[test]
    fn concave_shape_has_lower_solidity() {
        let img = GrayImage::new(20, 20);
        // L shape.
        let path = Path::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 4.0),
            Point::new(4.0, 4.0),
            Point::new(4.0, 10.0),
            Point::new(0.0, 10.0),
        ])
        .closed();
        let m = calculate_morphological_metrics(&path, &img);
        assert!((m.area - 64.0).abs() < 1e-9);
        assert!(m.solidity < 0.9);
        assert!(m.convexity < 1.0);
    }

    #[test]
    fn uniform_region_texture() {
        let img = GrayImage::from_pixel(20, 20, Luma([100]));
        let m = calculate_morphological_metrics(&square_path(5.0, 4.0), &img);
        assert!((m.mean - 100.0).abs() < 1e-9);
        assert!(m.variance.abs() < 1e-12);
        assert!(m.entropy.abs() < 1e-12);
        assert!(m.skewness.abs() < f64::EPSILON);
        assert!(m.kurtosis.abs() < f64::EPSILON);
        assert!(m.mean_gradient.abs() < 1e-9);
        assert_eq!(m.centroid, Point::new(6.5, 6.5));
    }

    #[test]
    fn two_level_texture_statistics() {
        // Left half 0, right half 200 inside a 4×4 square.
        let img = GrayImage::from_fn(10, 10, |x, _| Luma([if x < 4 { 0 } else { 200 }]));
        let m = calculate_morphological_metrics(&square_path(2.0, 4.0), &img);

        assert!((m.mean - 100.0).abs() < 1e-9);
        // 16 samples at ±100: sample variance = 16·100² / 15.
        let variance = 160_000.0 / 15.0;
        assert!((m.variance - variance).abs() < 1e-6);
        assert!((m.entropy - 1.0).abs() < 1e-12);
        assert!(m.skewness.abs() < 1e-9);
        // m4 = 100⁴ over s⁴ = (16/15 · 100²)².
        let kurtosis = 1.0 / (16.0f64 / 15.0).powi(2);
        assert!((m.kurtosis - kurtosis).abs() < 1e-9);
        assert!(m.mean_gradient > 0.0);
        assert!(m.variance_gradient > 0.0);
    }

    #[test]
    fn enclosed_pixels_use_centers_and_clip_to_raster() {
        let sq = square_path(2.0, 3.0);
        let pixels = enclosed_pixels(sq.points(), 10, 10);
        assert_eq!(pixels.len(), 9);
        assert!(pixels.contains(&(2, 2)) && pixels.contains(&(4, 4)));

        let overhang = square_path(-5.0, 8.0);
        let clipped = enclosed_pixels(overhang.points(), 4, 4);
        assert_eq!(clipped.len(), 9);
    }

    #[test]
    fn right_and_bottom_edge_pixels_have_no_gradient() {
        let img = GrayImage::from_pixel(3, 3, Luma([50]));
        let (mean, variance) = gradient_stats(&[(2, 0), (0, 2)], &img);
        assert!(mean.abs() < f64::EPSILON && variance.abs() < f64::EPSILON);
    }
}
