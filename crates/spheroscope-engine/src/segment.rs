//! Region-growing segmentation ("magic wand") and painted outlines.
//!
//! Both entry points turn a set of pixels into a closed core contour:
//! the pixels are reduced to a point cloud, ordered with
//! [`radial_contour`] around their centroid, and simplified with
//! Ramer-Douglas-Peucker.
//!
//! A blob pixel `(x, y)` covers the unit square `[x, x+1] × [y, y+1]`.
//! The magic wand therefore outlines a blob through the pixel corners on
//! its boundary, and measures angles from the mean of the pixel centers
//! `(x + 0.5, y + 0.5)`, so a filled `n × n` square yields a contour of
//! area `n²`.

use std::collections::VecDeque;

use image::RgbaImage;

use crate::config::EngineConfig;
use crate::geometry::vertex_centroid;
use crate::hull::convex_hull;
use crate::pixels::PixelSource;
use crate::simplify::{radial_contour, simplify};
use crate::types::{Dimensions, Path, Point, SegmentError};

/// A connected set of pixels produced by [`grow_region`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    dimensions: Dimensions,
    mask: Vec<bool>,
    pixels: Vec<(u32, u32)>,
}

impl Region {
    /// Pixels in breadth-first visiting order, seed first.
    #[must_use]
    pub fn pixels(&self) -> &[(u32, u32)] {
        &self.pixels
    }

    /// Number of pixels in the region.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Always `false`: a region contains at least its seed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Returns `true` if `(x, y)` belongs to the region. Positions outside
    /// the raster never do.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        self.dimensions.contains(x, y)
            && self.mask[y as usize * self.dimensions.width as usize + x as usize]
    }

    /// Mean of the pixel centers.
    #[must_use]
    pub fn center(&self) -> Option<Point> {
        let centers: Vec<Point> = self
            .pixels
            .iter()
            .map(|&(x, y)| Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5))
            .collect();
        vertex_centroid(&centers)
    }

    /// Pixel corners that touch at least one pixel outside the region,
    /// each reported once.
    #[must_use]
    pub fn boundary_corners(&self) -> Vec<Point> {
        let corner_width = self.dimensions.width as usize + 1;
        let corner_height = self.dimensions.height as usize + 1;
        let mut seen = vec![false; corner_width * corner_height];
        let mut corners = Vec::new();

        for &(x, y) in &self.pixels {
            for (cx, cy) in [(x, y), (x + 1, y), (x, y + 1), (x + 1, y + 1)] {
                let index = cy as usize * corner_width + cx as usize;
                if seen[index] {
                    continue;
                }
                seen[index] = true;
                let (cx, cy) = (i64::from(cx), i64::from(cy));
                let interior = self.contains(cx - 1, cy - 1)
                    && self.contains(cx, cy - 1)
                    && self.contains(cx - 1, cy)
                    && self.contains(cx, cy);
                if !interior {
                    #[allow(clippy::cast_precision_loss)]
                    corners.push(Point::new(cx as f64, cy as f64));
                }
            }
        }
        corners
    }
}

/// Successful magic-wand outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct MagicWandResult {
    /// Number of pixels in the grown blob.
    pub pixel_count: usize,
    /// The closed, simplified core contour.
    pub contour: Path,
}

/// Breadth-first 4-connected flood fill from `seed`.
///
/// A neighbor joins the region when the squared difference between its
/// red channel and the seed's red channel is at most `tolerance²`. Every
/// pixel is examined at most once: a rejected pixel is not reconsidered
/// from another neighbor.
///
/// # Errors
///
/// Returns [`SegmentError::SeedOutOfBounds`] if the seed lies outside
/// the raster.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn grow_region<S: PixelSource + ?Sized>(
    source: &S,
    seed_x: i64,
    seed_y: i64,
    tolerance: u8,
) -> Result<Region, SegmentError> {
    let dimensions = source.dimensions();
    if !dimensions.contains(seed_x, seed_y) {
        return Err(SegmentError::SeedOutOfBounds {
            x: seed_x,
            y: seed_y,
        });
    }

    let width = dimensions.width as usize;
    let seed = (seed_x as u32, seed_y as u32);
    let seed_red = i32::from(source.red(seed.0, seed.1));
    let tolerance_sq = i32::from(tolerance) * i32::from(tolerance);

    let mut visited = vec![false; dimensions.pixel_count()];
    let mut mask = vec![false; dimensions.pixel_count()];
    let mut pixels = Vec::new();
    let mut queue = VecDeque::from([seed]);
    visited[seed.1 as usize * width + seed.0 as usize] = true;

    while let Some((x, y)) = queue.pop_front() {
        mask[y as usize * width + x as usize] = true;
        pixels.push((x, y));

        let (xi, yi) = (i64::from(x), i64::from(y));
        for (nx, ny) in [(xi + 1, yi), (xi - 1, yi), (xi, yi + 1), (xi, yi - 1)] {
            if !dimensions.contains(nx, ny) {
                continue;
            }
            let index = ny as usize * width + nx as usize;
            if visited[index] {
                continue;
            }
            visited[index] = true;
            let diff = seed_red - i32::from(source.red(nx as u32, ny as u32));
            if diff * diff <= tolerance_sq {
                queue.push_back((nx as u32, ny as u32));
            }
        }
    }

    log::trace!(
        "grown region from ({seed_x}, {seed_y}) with tolerance {tolerance}: {} pixels",
        pixels.len()
    );

    Ok(Region {
        dimensions,
        mask,
        pixels,
    })
}

/// Select a core contour by growing a region from `seed`.
///
/// The seed position is floored to the pixel grid. Uses
/// `config.magic_wand_tolerance`, `config.min_blob_pixels`, and
/// `config.contour_simplify_tolerance`.
///
/// # Errors
///
/// - [`SegmentError::SeedOutOfBounds`] if the seed is outside the image.
/// - [`SegmentError::BlobTooSmall`] if the blob has no more than
///   `min_blob_pixels` pixels.
/// - [`SegmentError::DegenerateContour`] if the simplified outline has
///   fewer than 3 vertices.
#[allow(clippy::cast_possible_truncation)]
pub fn magic_wand<S: PixelSource + ?Sized>(
    source: &S,
    seed: Point,
    config: &EngineConfig,
) -> Result<MagicWandResult, SegmentError> {
    let seed_x = if seed.x.is_finite() { seed.x.floor() as i64 } else { -1 };
    let seed_y = if seed.y.is_finite() { seed.y.floor() as i64 } else { -1 };

    let region = grow_region(source, seed_x, seed_y, config.magic_wand_tolerance)?;
    if region.len() <= config.min_blob_pixels {
        log::debug!(
            "magic wand rejected: {} pixels, floor is {}",
            region.len(),
            config.min_blob_pixels
        );
        return Err(SegmentError::BlobTooSmall {
            pixels: region.len(),
        });
    }

    let center = region
        .center()
        .ok_or(SegmentError::BlobTooSmall { pixels: 0 })?;
    let outline = radial_contour(&region.boundary_corners(), center);
    let contour = close_simplified(&outline, config.contour_simplify_tolerance)?;

    log::debug!(
        "magic wand selected {} pixels, contour has {} vertices",
        region.len(),
        contour.len()
    );

    Ok(MagicWandResult {
        pixel_count: region.len(),
        contour,
    })
}

/// Simplify an outline and close it, rejecting outlines that collapse.
fn close_simplified(outline: &Path, tolerance: f64) -> Result<Path, SegmentError> {
    let simplified = simplify(outline.points(), tolerance);
    if simplified.len() < 3 {
        return Err(SegmentError::DegenerateContour {
            points: simplified.len(),
        });
    }
    Ok(simplified.closed())
}

/// Sample painted pixels from a paint layer.
///
/// Visits every `step`-th column and row (starting at 0) and returns the
/// positions whose alpha is non-zero. A zero step is treated as 1.
#[must_use]
pub fn painted_points(mask: &RgbaImage, step: u32) -> Vec<Point> {
    let step = step.max(1) as usize;
    let mut points = Vec::new();
    for y in (0..mask.height()).step_by(step) {
        for x in (0..mask.width()).step_by(step) {
            if mask.get_pixel(x, y).0[3] > 0 {
                points.push(Point::new(f64::from(x), f64::from(y)));
            }
        }
    }
    points
}

/// Build a closed core contour from painted sample points.
///
/// The points are ordered radially around their own mean, simplified
/// with `config.contour_simplify_tolerance`, and closed.
///
/// # Errors
///
/// - [`SegmentError::TooFewPaintedPoints`] when fewer than
///   `config.min_painted_points` points were sampled.
/// - [`SegmentError::DegenerateContour`] when the outline collapses.
pub fn contour_from_painted(points: &[Point], config: &EngineConfig) -> Result<Path, SegmentError> {
    let center = painted_center(points, config)?;
    let outline = radial_contour(points, center);
    let contour = close_simplified(&outline, config.contour_simplify_tolerance)?;
    log::debug!(
        "painted core from {} samples has {} vertices",
        points.len(),
        contour.len()
    );
    Ok(contour)
}

/// Build a migration margin from painted sample points: their convex
/// hull, closed when it has more than two vertices.
///
/// # Errors
///
/// Returns [`SegmentError::TooFewPaintedPoints`] when fewer than
/// `config.min_painted_points` points were sampled.
pub fn margin_from_painted(points: &[Point], config: &EngineConfig) -> Result<Path, SegmentError> {
    painted_center(points, config)?;
    let hull = convex_hull(points);
    let margin = if hull.len() > 2 { hull.closed() } else { hull };
    log::debug!(
        "painted margin from {} samples has {} vertices",
        points.len(),
        margin.len()
    );
    Ok(margin)
}

fn painted_center(points: &[Point], config: &EngineConfig) -> Result<Point, SegmentError> {
    let too_few = SegmentError::TooFewPaintedPoints {
        points: points.len(),
    };
    if points.len() < config.min_painted_points {
        log::debug!(
            "painted area rejected: {} samples, need {}",
            points.len(),
            config.min_painted_points
        );
        return Err(too_few);
    }
    vertex_centroid(points).ok_or(too_few)
}
