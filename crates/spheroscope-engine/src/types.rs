//! Shared types for the spheroscope analysis engine.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can hand grayscale
/// rasters to the engine without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can reference decoded
/// source images without depending on `image` directly.
pub use image::RgbaImage;

/// A 2D point in image coordinates.
///
/// Coordinates are in pixels and need not be integral: simplified and
/// smoothed contours carry fractional positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Bearing of this point as seen from `origin`, in radians in `(-π, π]`.
    #[must_use]
    pub fn bearing_from(self, origin: Self) -> f64 {
        (self.y - origin.y).atan2(self.x - origin.x)
    }

    /// The point `distance` pixels away from `self` along `angle`.
    #[must_use]
    pub fn offset_polar(self, angle: f64, distance: f64) -> Self {
        Self::new(
            distance.mul_add(angle.cos(), self.x),
            distance.mul_add(angle.sin(), self.y),
        )
    }
}

/// An ordered sequence of points.
///
/// "Closed" is a convention only: a closed path repeats its first point
/// as its last. Nothing enforces it, so consumers check
/// [`is_closed`](Self::is_closed) and [`len`](Self::len) explicitly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Path(Vec<Point>);

impl Path {
    /// Create a new path from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the path has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the path, including a closing
    /// duplicate if present.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first point, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Point> {
        self.0.first()
    }

    /// Returns the last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Point> {
        self.0.last()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the path and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }

    /// Returns `true` if the path has at least two points and its last
    /// point equals its first.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.0.len() > 1 && self.0.first() == self.0.last()
    }

    /// The points without the closing duplicate (all points when the
    /// path is open).
    #[must_use]
    pub fn open_points(&self) -> &[Point] {
        if self.is_closed() {
            &self.0[..self.0.len() - 1]
        } else {
            &self.0
        }
    }

    /// Close the path by appending its first point, unless it is empty
    /// or already closed.
    #[must_use]
    pub fn closed(mut self) -> Self {
        if let Some(&first) = self.0.first()
            && !self.is_closed()
        {
            self.0.push(first);
        }
        self
    }
}

impl From<Vec<Point>> for Path {
    fn from(points: Vec<Point>) -> Self {
        Self(points)
    }
}

impl FromIterator<Point> for Path {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Returns `true` if `(x, y)` lies inside the raster.
    #[must_use]
    pub fn contains(self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < i64::from(self.width) && y < i64::from(self.height)
    }

    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Scale-bar calibration: `pixels` on the image correspond to
/// `micrometers` in the specimen.
///
/// The engine computes everything in pixels; this mapping is only
/// applied when producing reports and particle areas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    /// Length of the scale bar in pixels.
    pub pixels: f64,
    /// Length of the scale bar in micrometers.
    pub micrometers: f64,
}

impl Default for Scale {
    fn default() -> Self {
        Self {
            pixels: 1.0,
            micrometers: 1.0,
        }
    }
}

impl Scale {
    /// Create a new scale mapping.
    #[must_use]
    pub const fn new(pixels: f64, micrometers: f64) -> Self {
        Self {
            pixels,
            micrometers,
        }
    }

    /// Micrometers per pixel. Non-positive or non-finite inputs fall
    /// back to 1 on either side.
    #[must_use]
    pub fn micrometers_per_pixel(self) -> f64 {
        let sanitize = |v: f64| if v.is_finite() && v > 0.0 { v } else { 1.0 };
        sanitize(self.micrometers) / sanitize(self.pixels)
    }

    /// Convert a pixel distance to micrometers.
    #[must_use]
    pub fn to_micrometers(self, pixels: f64) -> f64 {
        pixels * self.micrometers_per_pixel()
    }

    /// Convert a pixel area to square micrometers.
    #[must_use]
    pub fn to_square_micrometers(self, pixels_squared: f64) -> f64 {
        pixels_squared * self.micrometers_per_pixel().powi(2)
    }
}

/// Errors at the decode and configuration boundary.
///
/// Geometric shortfalls (short paths, tiny blobs) are not errors of this
/// kind; they come back as the typed outcomes below.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Engine configuration is invalid.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}

/// Why a region-growing or painted segmentation produced no contour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SegmentError {
    /// The seed lies outside the pixel buffer.
    #[error("seed ({x}, {y}) lies outside the image")]
    SeedOutOfBounds {
        /// Seed column.
        x: i64,
        /// Seed row.
        y: i64,
    },

    /// The grown region did not exceed the noise floor.
    #[error("selected region is too small ({pixels} pixels)")]
    BlobTooSmall {
        /// Number of pixels in the rejected region.
        pixels: usize,
    },

    /// The region was large enough but its outline collapsed to fewer
    /// than three vertices.
    #[error("region outline collapsed to {points} points")]
    DegenerateContour {
        /// Number of vertices left after simplification.
        points: usize,
    },

    /// Not enough painted pixels to derive an outline.
    #[error("painted area is too small ({points} sampled points)")]
    TooFewPaintedPoints {
        /// Number of sampled painted points.
        points: usize,
    },
}

/// Why a contour refinement was rejected. The caller keeps the prior
/// contour in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RefineError {
    /// The input contour has fewer than three points.
    #[error("contour has only {points} points; nothing to refine")]
    ContourTooShort {
        /// Number of points in the input contour.
        points: usize,
    },

    /// Refinement collapsed the contour to two points or fewer.
    #[error("refinement produced no improvement ({points} points)")]
    NoImprovement {
        /// Number of points in the rejected output.
        points: usize,
    },
}

/// Why an analysis-workflow operation did not change anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    /// The core contour has fewer than three points.
    #[error("core contour is undefined or invalid ({points} points)")]
    ContourTooShort {
        /// Number of points in the core contour.
        points: usize,
    },

    /// The operation needs a core analysis result that does not exist yet.
    #[error("core analysis has not been run")]
    NoCoreResult,

    /// The requested workflow step is still locked.
    #[error("workflow step {requested} is locked")]
    StepLocked {
        /// The requested step index.
        requested: u8,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- Point tests ---

    #[test]
    fn point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance_squared(b) - 25.0).abs() < f64::EPSILON);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn point_bearing_follows_image_axes() {
        let origin = Point::new(10.0, 10.0);
        assert!(Point::new(20.0, 10.0).bearing_from(origin).abs() < 1e-12);
        // +y points down the image.
        let down = Point::new(10.0, 20.0).bearing_from(origin);
        assert!((down - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn point_offset_polar() {
        let p = Point::new(1.0, 1.0).offset_polar(std::f64::consts::PI, 2.0);
        assert!((p.x + 1.0).abs() < 1e-12);
        assert!((p.y - 1.0).abs() < 1e-12);
    }

    // --- Path tests ---

    #[test]
    fn path_empty() {
        let path = Path::default();
        assert!(path.is_empty());
        assert!(!path.is_closed());
        assert!(path.open_points().is_empty());
        assert!(path.closed().is_empty());
    }

    #[test]
    fn path_closed_appends_first_point_once() {
        let path = Path::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
        ]);
        assert!(!path.is_closed());
        let closed = path.closed();
        assert_eq!(closed.len(), 4);
        assert!(closed.is_closed());
        assert_eq!(closed.open_points().len(), 3);
        assert_eq!(closed.clone().closed(), closed);
    }

    #[test]
    fn single_point_path_is_not_closed() {
        let path = Path::new(vec![Point::new(2.0, 2.0)]);
        assert!(!path.is_closed());
    }

    // --- Dimensions tests ---

    #[test]
    fn dimensions_contains() {
        let d = Dimensions {
            width: 4,
            height: 3,
        };
        assert!(d.contains(0, 0));
        assert!(d.contains(3, 2));
        assert!(!d.contains(4, 0));
        assert!(!d.contains(0, -1));
        assert_eq!(d.pixel_count(), 12);
    }

    // --- Scale tests ---

    #[test]
    fn scale_converts_lengths_and_areas() {
        let scale = Scale::new(100.0, 50.0);
        assert!((scale.to_micrometers(10.0) - 5.0).abs() < 1e-12);
        assert!((scale.to_square_micrometers(100.0) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn scale_falls_back_on_invalid_input() {
        let scale = Scale::new(0.0, f64::NAN);
        assert!((scale.micrometers_per_pixel() - 1.0).abs() < f64::EPSILON);
    }

    // --- Error display tests ---

    #[test]
    fn error_display() {
        assert_eq!(
            EngineError::EmptyInput.to_string(),
            "input image data is empty"
        );
        assert_eq!(
            SegmentError::BlobTooSmall { pixels: 7 }.to_string(),
            "selected region is too small (7 pixels)",
        );
        assert_eq!(
            RefineError::NoImprovement { points: 2 }.to_string(),
            "refinement produced no improvement (2 points)",
        );
    }

    #[test]
    fn path_serde_round_trip() {
        let path = Path::new(vec![Point::new(0.1, 0.2), Point::new(1.0 / 3.0, 2.5)]);
        let json = serde_json::to_string(&path).unwrap();
        let deserialized: Path = serde_json::from_str(&json).unwrap();
        assert_eq!(path, deserialized);
    }
}
