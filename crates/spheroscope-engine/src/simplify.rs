//! Polyline simplification and contour building.
//!
//! - [`simplify`]: Ramer-Douglas-Peucker reduction.
//! - [`radial_contour`]: turns an unordered point cloud into an ordered,
//!   star-shaped outline around a center.
//! - [`smooth_path`]: moving-average smoothing that respects closure.

use crate::types::{Path, Point};

/// Number of angular bins used by [`radial_contour`] (one per degree).
const RADIAL_BINS: usize = 360;

/// Simplify a point sequence using the Ramer-Douglas-Peucker algorithm.
///
/// Interior points whose distance to the chord between the retained
/// neighbors is at most `tolerance` pixels are removed. The first and
/// last points are always kept. A closed path stays closed because its
/// endpoints coincide.
///
/// Inputs with fewer than 3 points are returned unchanged.
#[must_use = "returns the simplified path"]
pub fn simplify(points: &[Point], tolerance: f64) -> Path {
    if points.len() < 3 {
        return Path::new(points.to_vec());
    }

    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[points.len() - 1] = true;

    rdp_recurse(points, 0, points.len() - 1, tolerance * tolerance, &mut kept);

    points
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect()
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the point between `start` and `end` farthest from the segment
/// joining them. If its squared distance exceeds `tolerance_sq`, the
/// point is kept and both sub-ranges are processed recursively.
fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance_sq: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist_sq = 0.0;
    let mut max_idx = start;

    for i in (start + 1)..end {
        let d = segment_distance_squared(points[i], points[start], points[end]);
        if d > max_dist_sq {
            max_dist_sq = d;
            max_idx = i;
        }
    }

    if max_dist_sq > tolerance_sq {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance_sq, kept);
        rdp_recurse(points, max_idx, end, tolerance_sq, kept);
    }
}

/// Squared distance from `p` to the segment `a`-`b`.
///
/// The projection parameter is clamped to `[0, 1]`, so points beyond an
/// endpoint measure to that endpoint. When `a` and `b` coincide this is
/// the squared distance to `a`.
fn segment_distance_squared(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance_squared(a);
    }

    let t = ((p.x - a.x).mul_add(dx, (p.y - a.y) * dy) / length_sq).clamp(0.0, 1.0);
    p.distance_squared(Point::new(t.mul_add(dx, a.x), t.mul_add(dy, a.y)))
}

/// Build an ordered outline from an unordered point cloud.
///
/// Points are bucketed into 360 one-degree bins by their bearing from
/// `center` (rounded to the nearest degree). Each bin keeps only its
/// farthest point; points coinciding with `center` are never kept. The
/// non-empty bins are returned in angle order from 0° to 359°.
///
/// The result is star-shaped around `center`: re-entrant concavities
/// are under-approximated by whichever point is farthest out along each
/// ray. Inputs with fewer than 3 points are returned unchanged.
#[must_use = "returns the radial contour"]
#[allow(clippy::cast_possible_truncation)]
pub fn radial_contour(points: &[Point], center: Point) -> Path {
    if points.len() < 3 {
        return Path::new(points.to_vec());
    }

    let mut farthest: [Option<(Point, f64)>; RADIAL_BINS] = [None; RADIAL_BINS];
    for &p in points {
        let degrees = p.bearing_from(center).to_degrees().round();
        if !degrees.is_finite() {
            continue;
        }
        let bin = (degrees as i64).rem_euclid(RADIAL_BINS as i64) as usize;
        let dist_sq = p.distance_squared(center);
        let best = farthest[bin].map_or(0.0, |(_, d)| d);
        if dist_sq > best {
            farthest[bin] = Some((p, dist_sq));
        }
    }

    farthest.iter().flatten().map(|&(p, _)| p).collect()
}

/// Moving-average smoothing over a window of `2 * window_size + 1`
/// samples.
///
/// For a closed path (first point equals last) indices wrap around the
/// distinct points and the result is re-closed, so the output has the
/// same length and stays closed. For an open path indices clamp at the
/// ends. Paths shorter than 3 points or a zero window are returned
/// unchanged.
#[must_use = "returns the smoothed path"]
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn smooth_path(path: &[Point], window_size: usize) -> Path {
    if path.len() < 3 || window_size == 0 {
        return Path::new(path.to_vec());
    }

    let closed = path.first() == path.last();
    let count = if closed { path.len() - 1 } else { path.len() };
    let window = window_size as isize;
    let samples = (2 * window_size + 1) as f64;

    let mut smoothed: Vec<Point> = (0..count as isize)
        .map(|i| {
            let (sx, sy) = (-window..=window).fold((0.0, 0.0), |(sx, sy), offset| {
                let j = i + offset;
                let index = if closed {
                    j.rem_euclid(count as isize) as usize
                } else {
                    j.clamp(0, count as isize - 1) as usize
                };
                (sx + path[index].x, sy + path[index].y)
            });
            Point::new(sx / samples, sy / samples)
        })
        .collect();

    if closed && let Some(&first) = smoothed.first() {
        smoothed.push(first);
    }
    Path::new(smoothed)
}
