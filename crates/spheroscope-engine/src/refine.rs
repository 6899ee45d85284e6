//! Contour refinement: snap an existing contour to nearby brightness edges.
//!
//! This module defines the [`ContourRefiner`] trait for pluggable
//! refinement strategies and the [`RefinerKind`] enum for selecting one
//! at runtime. Today there is a single deterministic strategy,
//! [`RefinerKind::Gradient`].

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::pixels::{PixelSource, luma_nearest};
use crate::simplify::smooth_path;
use crate::types::{Path, Point, RefineError};

/// Selects which refinement algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefinerKind {
    /// Move each vertex along its outward normal to the strongest
    /// brightness step within `search_distance` pixels, then smooth.
    Gradient {
        /// Half-length of the sampled profile in pixels.
        search_distance: u32,
        /// Moving-average window applied after relocation.
        smoothing_window: usize,
    },
}

impl Default for RefinerKind {
    fn default() -> Self {
        Self::Gradient {
            search_distance: EngineConfig::DEFAULT_REFINE_SEARCH_DISTANCE,
            smoothing_window: EngineConfig::DEFAULT_REFINE_SMOOTHING_WINDOW,
        }
    }
}

impl RefinerKind {
    /// The gradient refiner parameterized from an engine config.
    #[must_use]
    pub const fn from_config(config: &EngineConfig) -> Self {
        Self::Gradient {
            search_distance: config.refine_search_distance,
            smoothing_window: config.refine_smoothing_window,
        }
    }
}

/// Trait for contour refinement strategies.
///
/// Input: a closed contour, the point its normals radiate from, and the
/// image to read brightness from. Output: a contour with the same number
/// of vertices. On error the caller keeps the prior contour.
pub trait ContourRefiner {
    /// Refine `contour` against `source`.
    ///
    /// # Errors
    ///
    /// Returns [`RefineError::ContourTooShort`] for fewer than 3 input
    /// points and [`RefineError::NoImprovement`] if the result collapses
    /// to 2 points or fewer.
    fn refine(
        &self,
        contour: &Path,
        center: Point,
        source: &dyn PixelSource,
    ) -> Result<Path, RefineError>;
}

impl ContourRefiner for RefinerKind {
    fn refine(
        &self,
        contour: &Path,
        center: Point,
        source: &dyn PixelSource,
    ) -> Result<Path, RefineError> {
        match *self {
            Self::Gradient {
                search_distance,
                smoothing_window,
            } => refine_gradient(contour, center, source, search_distance, smoothing_window),
        }
    }
}

fn refine_gradient(
    contour: &Path,
    center: Point,
    source: &dyn PixelSource,
    search_distance: u32,
    smoothing_window: usize,
) -> Result<Path, RefineError> {
    if contour.len() < 3 {
        return Err(RefineError::ContourTooShort {
            points: contour.len(),
        });
    }

    let relocated: Vec<Point> = contour
        .points()
        .iter()
        .map(|&p| snap_to_edge(p, center, source, search_distance))
        .collect();

    let moved = relocated
        .iter()
        .zip(contour.points())
        .filter(|(a, b)| a != b)
        .count();

    let refined = smooth_path(&relocated, smoothing_window);
    if refined.len() <= 2 {
        return Err(RefineError::NoImprovement {
            points: refined.len(),
        });
    }

    log::debug!(
        "gradient refinement moved {moved} of {} vertices",
        contour.len()
    );
    Ok(refined)
}

/// Relocate one vertex to the sample with the largest step in brightness
/// along its normal. A vertex coinciding with `center` has no normal and
/// is returned unchanged.
fn snap_to_edge(p: Point, center: Point, source: &dyn PixelSource, search_distance: u32) -> Point {
    let length = p.distance(center);
    if length == 0.0 || !length.is_finite() {
        return p;
    }
    let normal = Point::new((p.x - center.x) / length, (p.y - center.y) / length);
    let at = |i: i64| {
        #[allow(clippy::cast_precision_loss)]
        let t = i as f64;
        Point::new(t.mul_add(normal.x, p.x), t.mul_add(normal.y, p.y))
    };

    let d = i64::from(search_distance);
    let mut best_step = -1.0;
    let mut best = p;
    let mut current = luma_nearest(source, at(-d));
    for i in -d..d {
        let next = luma_nearest(source, at(i + 1));
        let step = (next - current).abs();
        if step > best_step {
            best_step = step;
            best = at(i);
        }
        current = next;
    }

    log::trace!("vertex ({:.1}, {:.1}) -> ({:.1}, {:.1})", p.x, p.y, best.x, best.y);
    best
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::PI;

    use image::{GrayImage, Luma};

    use super::*;

    fn disc_image(size: u32, center: Point, radius: f64) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            let p = Point::new(f64::from(x), f64::from(y));
            Luma([if p.distance(center) <= radius { 200 } else { 0 }])
        })
    }

    fn circle_contour(n: usize, center: Point, radius: f64) -> Path {
        (0..n)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let angle = 2.0 * PI * i as f64 / n as f64;
                center.offset_polar(angle, radius)
            })
            .collect::<Path>()
            .closed()
    }

    #[test]
    fn default_is_gradient_with_config_defaults() {
        assert_eq!(
            RefinerKind::default(),
            RefinerKind::from_config(&EngineConfig::default())
        );
    }

    #[test]
    fn snaps_undersized_contour_to_disc_edge() {
        let center = Point::new(50.0, 50.0);
        let img = disc_image(100, center, 20.0);
        let contour = circle_contour(360, center, 15.0);

        let refined = RefinerKind::default()
            .refine(&contour, center, &img)
            .unwrap();

        assert_eq!(refined.len(), contour.len());
        assert!(refined.is_closed());
        #[allow(clippy::cast_precision_loss)]
        let mean_radius = refined
            .open_points()
            .iter()
            .map(|p| p.distance(center))
            .sum::<f64>()
            / refined.open_points().len() as f64;
        assert!((mean_radius - 20.0).abs() < 1.5, "mean radius {mean_radius}");
    }

    #[test]
    fn short_contour_is_rejected() {
        let img = GrayImage::new(10, 10);
        let contour = Path::new(vec![Point::new(1.0, 1.0), Point::new(2.0, 2.0)]);
        let err = RefinerKind::default()
            .refine(&contour, Point::new(5.0, 5.0), &img)
            .unwrap_err();
        assert_eq!(err, RefineError::ContourTooShort { points: 2 });
    }

    #[test]
    fn vertex_at_center_passes_through() {
        let img = disc_image(40, Point::new(20.0, 20.0), 10.0);
        let center = Point::new(20.0, 20.0);
        assert_eq!(snap_to_edge(center, center, &img, 20), center);
    }

    #[test]
    fn flat_profile_keeps_first_sample() {
        // No brightness steps: every difference ties at 0, so the first
        // sample (farthest inward) wins.
        let img = GrayImage::from_pixel(60, 60, Luma([90]));
        let center = Point::new(30.0, 30.0);
        let p = Point::new(40.0, 30.0);
        let snapped = snap_to_edge(p, center, &img, 5);
        assert!((snapped.x - 35.0).abs() < 1e-12);
        assert!((snapped.y - 30.0).abs() < 1e-12);
    }

    #[test]
    fn out_of_bounds_samples_read_as_black() {
        // The profile runs from x = 4 to x = 10; the last column is the
        // only step because x = 10 lies outside the raster.
        let img = GrayImage::from_pixel(10, 10, Luma([255]));
        let center = Point::new(0.0, 5.0);
        let snapped = snap_to_edge(Point::new(7.0, 5.0), center, &img, 3);
        assert!((snapped.x - 9.0).abs() < 1e-12, "snapped to {snapped:?}");
    }
}
