//! Pixel-space geometry used by crossing detection and zone membership.
//!
//! Pure logic. Degenerate inputs (zero-length lines, polygons with fewer
//! than three vertices) are answered with "no" rather than an error.

use serde::{Deserialize, Serialize};

/// A point in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A user-drawn line, given by two endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub start: Point,
    pub end: Point,
}

impl LineSegment {
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }
}

/// Perpendicular distance from `point` to the infinite line through `line`.
///
/// The distance is not clamped to the segment: a point collinear with the
/// line but far past an endpoint has distance 0. Returns `None` when both
/// endpoints coincide.
pub fn point_line_distance(point: Point, line: &LineSegment) -> Option<f64> {
    let (x1, y1) = (line.start.x, line.start.y);
    let (x2, y2) = (line.end.x, line.end.y);

    let denominator = (y2 - y1).hypot(x2 - x1);
    if denominator == 0.0 {
        return None;
    }

    let numerator = ((y2 - y1) * point.x - (x2 - x1) * point.y + x2 * y1 - y2 * x1).abs();
    Some(numerator / denominator)
}

/// Ray-casting point-in-polygon test over the edges in the given order.
///
/// Works for non-convex polygons in either winding direction. A point on a
/// top edge or right of every crossing is outside; fewer than three vertices
/// is always outside.
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let Point { x, y } = point;
    let mut inside = false;
    let mut p1 = polygon[0];

    for i in 1..=n {
        let p2 = polygon[i % n];
        if y > p1.y.min(p2.y) && y <= p1.y.max(p2.y) && x <= p1.x.max(p2.x) {
            // The y-extent check above rules out horizontal edges here.
            let crosses = p1.x == p2.x || {
                let x_intersect = (y - p1.y) * (p2.x - p1.x) / (p2.y - p1.y) + p1.x;
                x <= x_intersect
            };
            if crosses {
                inside = !inside;
            }
        }
        p1 = p2;
    }

    inside
}
