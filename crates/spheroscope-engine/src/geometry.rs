//! Polygon measurements and lookups shared by every later stage.
//!
//! All functions are pure and take plain point slices, so they accept
//! both open and closed paths. Inputs too short to describe an area
//! yield 0 or `false` rather than an error.

use std::f64::consts::PI;

use crate::types::Point;

/// Area enclosed by a polygon (shoelace formula, absolute value).
///
/// A closing duplicate point contributes a zero-length edge and does not
/// change the result. Returns 0 for fewer than 3 points.
#[must_use]
pub fn polygon_area(path: &[Point]) -> f64 {
    if path.len() < 3 {
        return 0.0;
    }
    let n = path.len();
    let twice_signed: f64 = (0..n)
        .map(|i| {
            let a = path[i];
            let b = path[(i + 1) % n];
            a.x.mul_add(b.y, -(b.x * a.y))
        })
        .sum();
    (twice_signed / 2.0).abs()
}

/// Total length of a path.
///
/// Sums consecutive segment lengths. When the path is not already closed
/// and has more than two points, the wrap-around segment from the last
/// point back to the first is added.
#[must_use]
pub fn path_perimeter(path: &[Point]) -> f64 {
    if path.len() < 2 {
        return 0.0;
    }
    let open_length: f64 = path.windows(2).map(|w| w[0].distance(w[1])).sum();
    let first = path[0];
    let last = path[path.len() - 1];
    if path.len() > 2 && first != last {
        open_length + last.distance(first)
    } else {
        open_length
    }
}

/// Even-odd ray-cast containment test.
///
/// Returns `false` for fewer than 3 points. Points exactly on an edge
/// may land on either side.
#[must_use]
pub fn point_in_polygon(point: Point, path: &[Point]) -> bool {
    if path.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = path.len() - 1;
    for i in 0..path.len() {
        let (pi, pj) = (path[i], path[j]);
        if (pi.y > point.y) != (pj.y > point.y)
            && point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Smallest circular distance between two angles, in `[0, π]`.
#[must_use]
pub fn angular_distance(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(2.0 * PI);
    if diff > PI { 2.0 * PI - diff } else { diff }
}

/// The path vertex whose bearing from `center` is closest to `angle`.
///
/// A linear scan in path order: ties resolve to the first vertex
/// encountered. This approximates "where the ray at `angle` leaves the
/// contour" only for star-shaped paths with dense vertices. Returns
/// `None` for an empty path.
#[must_use]
pub fn nearest_point_at_angle(path: &[Point], center: Point, angle: f64) -> Option<Point> {
    let mut best: Option<(Point, f64)> = None;
    for &p in path {
        let diff = angular_distance(angle, p.bearing_from(center));
        if best.is_none_or(|(_, d)| diff < d) {
            best = Some((p, diff));
        }
    }
    best.map(|(p, _)| p)
}

/// Arithmetic mean of the vertices, `None` for an empty slice.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn vertex_centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some(Point::new(sx / n, sy / n))
}

/// Largest distance between any two vertices (O(n²)).
#[must_use]
pub fn max_pairwise_distance(points: &[Point]) -> f64 {
    let mut max_sq: f64 = 0.0;
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            max_sq = max_sq.max(a.distance_squared(*b));
        }
    }
    max_sq.sqrt()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use geo::{Area, LineString, Polygon};

    use super::*;

    fn square(side: f64) -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(side, 0.0),
            Point::new(side, side),
            Point::new(0.0, side),
        ]
    }

    fn geo_area(points: &[Point]) -> f64 {
        let ring: LineString<f64> = points.iter().map(|p| (p.x, p.y)).collect();
        Polygon::new(ring, vec![]).unsigned_area()
    }

    // --- polygon_area ---

    #[test]
    fn area_of_square() {
        assert!((polygon_area(&square(10.0)) - 100.0).abs() < 1e-12);
    }

    #[test]
    fn area_too_few_points_is_zero() {
        assert!(polygon_area(&[]).abs() < f64::EPSILON);
        assert!(polygon_area(&square(3.0)[..2]).abs() < f64::EPSILON);
    }

    #[test]
    fn area_invariant_under_rotation_and_reversal() {
        let poly = vec![
            Point::new(1.0, 1.0),
            Point::new(7.0, 2.0),
            Point::new(9.0, 6.0),
            Point::new(4.0, 9.0),
            Point::new(0.5, 5.0),
        ];
        let base = polygon_area(&poly);
        for shift in 1..poly.len() {
            let mut rotated = poly.clone();
            rotated.rotate_left(shift);
            assert!((polygon_area(&rotated) - base).abs() < 1e-9);
        }
        let reversed: Vec<Point> = poly.iter().rev().copied().collect();
        assert!((polygon_area(&reversed) - base).abs() < 1e-9);
        assert!((base - geo_area(&poly)).abs() < 1e-9);
    }

    #[test]
    fn area_ignores_closing_duplicate() {
        let mut closed = square(4.0);
        closed.push(closed[0]);
        assert!((polygon_area(&closed) - 16.0).abs() < 1e-12);
    }

    #[test]
    fn self_intersecting_polygon_does_not_panic() {
        let bowtie = vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(4.0, 0.0),
            Point::new(0.0, 4.0),
        ];
        assert!(polygon_area(&bowtie).is_finite());
    }

    // --- path_perimeter ---

    #[test]
    fn perimeter_open_square_adds_wrap_segment() {
        assert!((path_perimeter(&square(2.0)) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn perimeter_closed_square_counts_once() {
        let mut closed = square(2.0);
        closed.push(closed[0]);
        assert!((path_perimeter(&closed) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn perimeter_two_points_has_no_wrap() {
        let line = [Point::new(0.0, 0.0), Point::new(3.0, 4.0)];
        assert!((path_perimeter(&line) - 5.0).abs() < 1e-12);
        assert!(path_perimeter(&line[..1]).abs() < f64::EPSILON);
    }

    // --- point_in_polygon ---

    #[test]
    fn point_in_square() {
        let sq = square(10.0);
        assert!(point_in_polygon(Point::new(5.0, 5.0), &sq));
        assert!(!point_in_polygon(Point::new(15.0, 5.0), &sq));
        assert!(!point_in_polygon(Point::new(-0.1, 5.0), &sq));
    }

    #[test]
    fn point_in_degenerate_polygon_is_false() {
        assert!(!point_in_polygon(Point::new(0.0, 0.0), &square(1.0)[..2]));
    }

    #[test]
    fn point_in_concave_polygon() {
        // U shape opening upwards.
        let u = vec![
            Point::new(0.0, 0.0),
            Point::new(3.0, 0.0),
            Point::new(3.0, 3.0),
            Point::new(2.0, 3.0),
            Point::new(2.0, 1.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 3.0),
            Point::new(0.0, 3.0),
        ];
        assert!(point_in_polygon(Point::new(0.5, 2.0), &u));
        assert!(!point_in_polygon(Point::new(1.5, 2.0), &u));
    }

    // --- nearest_point_at_angle ---

    #[test]
    fn nearest_angle_wraps_around_pi() {
        let center = Point::new(0.0, 0.0);
        let path = [
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(-1.0, -0.01),
        ];
        // Just past +π is closest to the vertex just below -π.
        let found = nearest_point_at_angle(&path, center, PI - 0.001).unwrap();
        assert_eq!(found, Point::new(-1.0, -0.01));
    }

    #[test]
    fn nearest_angle_tie_keeps_first() {
        let center = Point::new(0.0, 0.0);
        let path = [Point::new(1.0, 1.0), Point::new(1.0, -1.0)];
        let found = nearest_point_at_angle(&path, center, 0.0).unwrap();
        assert_eq!(found, Point::new(1.0, 1.0));
    }

    #[test]
    fn nearest_angle_empty_path() {
        assert!(nearest_point_at_angle(&[], Point::new(0.0, 0.0), 1.0).is_none());
    }

    #[test]
    fn angular_distance_is_symmetric_and_bounded() {
        assert!((angular_distance(0.1, 2.0 * PI - 0.1) - 0.2).abs() < 1e-12);
        assert!((angular_distance(-PI, PI)).abs() < 1e-12);
        assert!(angular_distance(0.0, PI) <= PI);
    }

    // --- helpers ---

    #[test]
    fn centroid_and_diameter_of_square() {
        let sq = square(2.0);
        assert_eq!(vertex_centroid(&sq), Some(Point::new(1.0, 1.0)));
        assert!((max_pairwise_distance(&sq) - 8.0f64.sqrt()).abs() < 1e-12);
        assert!(vertex_centroid(&[]).is_none());
        assert!(max_pairwise_distance(&[]).abs() < f64::EPSILON);
    }
}
