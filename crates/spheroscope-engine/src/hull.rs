//! Convex hull via Andrew's monotone chain.

use std::cmp::Ordering;

use crate::types::{Path, Point};

/// Z component of `(b - a) × (c - a)`: positive for a counter-clockwise
/// turn in a y-up frame.
fn cross(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x).mul_add(c.y - a.y, -((b.y - a.y) * (c.x - a.x)))
}

/// Lexicographic `(x, y)` order. NaN coordinates sort by IEEE total order
/// instead of aborting the sort.
fn lexicographic(a: &Point, b: &Point) -> Ordering {
    a.x.total_cmp(&b.x).then_with(|| a.y.total_cmp(&b.y))
}

/// Push `p` onto a hull chain, popping while the last two chain points
/// and `p` fail to make a strict left turn.
fn push_strict_turn(chain: &mut Vec<Point>, p: Point) {
    while chain.len() >= 2 && cross(chain[chain.len() - 2], chain[chain.len() - 1], p) <= 0.0 {
        chain.pop();
    }
    chain.push(p);
}

/// Convex hull of a point set.
///
/// Points are sorted by `(x, y)`; the lower and upper chains are built
/// with a strict-turn condition, so collinear points on the hull boundary
/// are dropped. The result is open (no closing duplicate), starts at the
/// lexicographically smallest point, and is counter-clockwise in a y-up
/// frame.
///
/// Inputs with fewer than 3 points are returned unchanged.
#[must_use = "returns the hull"]
pub fn convex_hull(points: &[Point]) -> Path {
    if points.len() < 3 {
        return Path::new(points.to_vec());
    }

    let mut sorted = points.to_vec();
    sorted.sort_by(lexicographic);

    let mut lower: Vec<Point> = Vec::with_capacity(sorted.len());
    for &p in &sorted {
        push_strict_turn(&mut lower, p);
    }

    let mut upper: Vec<Point> = Vec::with_capacity(sorted.len());
    for &p in sorted.iter().rev() {
        push_strict_turn(&mut upper, p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    Path::new(lower)
}
