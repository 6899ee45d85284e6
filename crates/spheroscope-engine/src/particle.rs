//! Cells around the spheroid: ellipse fitting and automatic detection.

use image::{GrayImage, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};
use serde::{Deserialize, Serialize};

use crate::config::{CellPolarity, EngineConfig};
use crate::geometry::vertex_centroid;
use crate::pixels::{PixelSource, to_gray_image};
use crate::types::{Point, Scale};

/// Radius used for particles too small to fit an ellipse to.
const FALLBACK_RADIUS: f64 = 3.0;

/// Fewest pixels for which [`fit_ellipse`] uses image moments.
const MIN_MOMENT_PIXELS: usize = 5;

/// An oriented ellipse in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    /// Center of the ellipse.
    pub centroid: Point,
    /// Semi-axis along `angle`.
    pub radius_x: f64,
    /// Semi-axis perpendicular to `angle`.
    pub radius_y: f64,
    /// Orientation in radians.
    pub angle: f64,
}

impl Ellipse {
    /// Returns `true` if `point` lies inside the ellipse with both radii
    /// multiplied by `scale`.
    #[must_use]
    pub fn contains(&self, point: Point, scale: f64) -> bool {
        let (sin, cos) = self.angle.sin_cos();
        let dx = point.x - self.centroid.x;
        let dy = point.y - self.centroid.y;
        let along = cos.mul_add(dx, sin * dy);
        let across = sin.mul_add(dx, -(cos * dy));
        let rx = self.radius_x * scale;
        let ry = self.radius_y * scale;
        if rx <= 0.0 || ry <= 0.0 {
            return point == self.centroid;
        }
        (along * along) / (rx * rx) + (across * across) / (ry * ry) <= 1.0
    }
}

/// Fit an ellipse to a pixel set from its second-order central moments.
///
/// Sets with fewer than 5 pixels get a circle of radius 3 at their mean
/// (or at the origin when empty).
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::similar_names)]
pub fn fit_ellipse(points: &[Point]) -> Ellipse {
    let centroid = vertex_centroid(points).unwrap_or_default();
    if points.len() < MIN_MOMENT_PIXELS {
        return Ellipse {
            centroid,
            radius_x: FALLBACK_RADIUS,
            radius_y: FALLBACK_RADIUS,
            angle: 0.0,
        };
    }

    let n = points.len() as f64;
    let (mut m11, mut m20, mut m02) = (0.0, 0.0, 0.0);
    for p in points {
        let dx = p.x - centroid.x;
        let dy = p.y - centroid.y;
        m11 += dx * dy;
        m20 += dx * dx;
        m02 += dy * dy;
    }
    m11 /= n;
    m20 /= n;
    m02 /= n;

    let angle = 0.5 * (2.0 * m11).atan2(m20 - m02);
    let (sin, cos) = angle.sin_cos();
    let across = m20 * sin * sin - 2.0 * m11 * sin * cos + m02 * cos * cos;
    let along = m20 * cos * cos + 2.0 * m11 * sin * cos + m02 * sin * sin;

    Ellipse {
        centroid,
        radius_x: (4.0 * along.max(0.0)).sqrt(),
        radius_y: (4.0 * across.max(0.0)).sqrt(),
        angle,
    }
}

/// One cell placed by hand or found by detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// Mean position of the cell's pixels.
    pub centroid: Point,
    /// Moment ellipse of the cell's pixels.
    pub ellipse: Ellipse,
    /// Pixel count converted to square micrometers.
    pub area_um2: f64,
    /// `true` for cells placed by the user.
    pub is_manual: bool,
}

impl Particle {
    /// Build a particle from the pixels it covers.
    ///
    /// Returns `None` for an empty pixel set.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_pixels(pixels: &[Point], scale: Scale, is_manual: bool) -> Option<Self> {
        let centroid = vertex_centroid(pixels)?;
        Some(Self {
            centroid,
            ellipse: fit_ellipse(pixels),
            area_um2: scale.to_square_micrometers(pixels.len() as f64),
            is_manual,
        })
    }

    /// A manual one-pixel particle at `position`.
    #[must_use]
    pub fn manual(position: Point, scale: Scale) -> Self {
        Self {
            centroid: position,
            ellipse: fit_ellipse(&[position]),
            area_um2: scale.to_square_micrometers(1.0),
            is_manual: true,
        }
    }
}

/// Otsu-threshold the image and return the pixel sets of its
/// 8-connected foreground components with at least
/// `config.cell_min_pixels` pixels, largest label last.
///
/// Which side of the threshold is foreground follows
/// `config.cell_polarity`.
#[must_use]
pub fn find_cell_components<S: PixelSource + ?Sized>(
    source: &S,
    config: &EngineConfig,
) -> Vec<Vec<Point>> {
    let gray = to_gray_image(source);
    if gray.width() == 0 || gray.height() == 0 {
        return Vec::new();
    }
    let level = imageproc::contrast::otsu_level(&gray);
    let binary = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y).0[0];
        let foreground = match config.cell_polarity {
            CellPolarity::Bright => v > level,
            CellPolarity::Dark => v <= level,
        };
        Luma([if foreground { 255 } else { 0 }])
    });

    let labels = connected_components(&binary, Connectivity::Eight, Luma([0u8]));
    let mut components: Vec<Vec<Point>> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label.0[0] as usize;
        if label == 0 {
            continue;
        }
        if components.len() < label {
            components.resize_with(label, Vec::new);
        }
        components[label - 1].push(Point::new(f64::from(x), f64::from(y)));
    }

    let before = components.len();
    components.retain(|c| c.len() >= config.cell_min_pixels);
    log::debug!(
        "otsu level {level}: {before} components, {} kept",
        components.len()
    );
    components
}
