//! Vector math on plain coordinate arrays and 2D line intersection.

/// Point or vector in canvas space
pub type Point2 = [f64; 2];

/// Point or vector in world (patient) space
pub type Point3 = [f64; 3];

/// Below this determinant two infinite lines are treated as parallel
const PARALLEL_EPSILON: f64 = 1e-10;

#[inline]
pub fn add(a: Point3, b: Point3) -> Point3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub fn sub(a: Point3, b: Point3) -> Point3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn scale(a: Point3, factor: f64) -> Point3 {
    [a[0] * factor, a[1] * factor, a[2] * factor]
}

/// `point + direction * amount`
#[inline]
pub fn scale_and_add(point: Point3, direction: Point3, amount: f64) -> Point3 {
    [
        direction[0].mul_add(amount, point[0]),
        direction[1].mul_add(amount, point[1]),
        direction[2].mul_add(amount, point[2]),
    ]
}

#[inline]
pub fn dot(a: Point3, b: Point3) -> f64 {
    a[0].mul_add(b[0], a[1].mul_add(b[1], a[2] * b[2]))
}

pub fn cross(a: Point3, b: Point3) -> Point3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Unit vector in the direction of `a`, or `None` for a zero vector
pub fn normalize(a: Point3) -> Option<Point3> {
    let len = length(a);
    (len > 0.0 && len.is_finite()).then(|| scale(a, 1.0 / len))
}

#[inline]
pub fn length(a: Point3) -> f64 {
    dot(a, a).sqrt()
}

#[inline]
pub fn distance(a: Point3, b: Point3) -> f64 {
    length(sub(a, b))
}

/// Shortest distance from `point` to the segment `start`-`end` in the plane.
pub fn distance_to_segment(start: Point2, end: Point2, point: Point2) -> f64 {
    let dx = end[0] - start[0];
    let dy = end[1] - start[1];
    let length_sq = dx.mul_add(dx, dy * dy);

    let t = if length_sq == 0.0 {
        0.0
    } else {
        (((point[0] - start[0]) * dx + (point[1] - start[1]) * dy) / length_sq).clamp(0.0, 1.0)
    };

    let closest_x = t.mul_add(dx, start[0]);
    let closest_y = t.mul_add(dy, start[1]);
    (point[0] - closest_x).hypot(point[1] - closest_y)
}

/// Calculates the intersection point of two lines in the 2D plane.
///
/// The first line runs through `line1_start` and `line1_end`, the second
/// through `line2_start` and `line2_end`. With `infinite` set both are
/// treated as unbounded lines, otherwise as segments.
///
/// Returns `None` when the lines are parallel (infinite mode), when the
/// segments do not cross, or when the segment equations are degenerate and
/// the solve produces no finite point (e.g. collinear segments).
pub fn intersect_line(
    line1_start: Point2,
    line1_end: Point2,
    line2_start: Point2,
    line2_end: Point2,
    infinite: bool,
) -> Option<Point2> {
    let [x1, y1] = line1_start;
    let [x2, y2] = line1_end;
    let [x3, y3] = line2_start;
    let [x4, y4] = line2_end;

    if infinite {
        let denom = (x1 - x2) * (y3 - y4) - (y1 - y2) * (x3 - x4);
        if denom.abs() < PARALLEL_EPSILON {
            return None;
        }

        let t = ((x1 - x3) * (y3 - y4) - (y1 - y3) * (x3 - x4)) / denom;
        return Some([t.mul_add(x2 - x1, x1), t.mul_add(y2 - y1, y1)]);
    }

    // Line through points 1 and 2 as a1 * x + b1 * y + c1 = 0
    let a1 = y2 - y1;
    let b1 = x1 - x2;
    let c1 = x2 * y1 - x1 * y2;

    let r3 = a1 * x3 + b1 * y3 + c1;
    let r4 = a1 * x4 + b1 * y4 + c1;
    if same_side(r3, r4) {
        return None;
    }

    let a2 = y4 - y3;
    let b2 = x3 - x4;
    let c2 = x4 * y3 - x3 * y4;

    let r1 = a2 * x1 + b2 * y1 + c2;
    let r2 = a2 * x2 + b2 * y2 + c2;
    if same_side(r1, r2) {
        return None;
    }

    let denom = a1 * b2 - a2 * b1;
    let x = (b1 * c2 - b2 * c1) / denom;
    let y = (a2 * c1 - a1 * c2) / denom;

    (x.is_finite() && y.is_finite()).then_some([x, y])
}

/// Both values non-zero with equal sign
#[inline]
fn same_side(a: f64, b: f64) -> bool {
    a != 0.0 && b != 0.0 && a.signum() == b.signum()
}
