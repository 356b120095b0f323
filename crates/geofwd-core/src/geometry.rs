//! Planar geometry used by the forwarding strategies
//!
//! All functions are pure. Distances ignore `z`.
//!
//! [`point_in_quad`] is an approximate containment test: it compares the
//! area of the quadrilateral against the area of the four triangles fanned
//! from the query point, after rounding both to a fixed number of decimal
//! places. Points within rounding distance of an edge may be classified
//! either way.

use crate::error::GeometryError;
use crate::position::{Point2D, Position};

/// Four corners of a quadrilateral, ordered consistently around its boundary
pub type Quad = [Point2D; 4];

/// Decimal places kept when comparing areas in [`point_in_quad`]
pub const DEFAULT_AREA_PRECISION: u32 = 2;

/// Planar Euclidean distance between two positions
pub fn distance(a: Position, b: Position) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Area of the triangle `p1 p2 p3` (absolute shoelace formula)
pub fn triangle_area(p1: Point2D, p2: Point2D, p3: Point2D) -> f64 {
    (p1.x * (p2.y - p3.y) + p2.x * (p3.y - p1.y) + p3.x * (p1.y - p2.y)).abs() / 2.0
}

/// Round `value` to `places` decimal places
pub fn round_to(value: f64, places: u32) -> f64 {
    let scale = 10f64.powi(places as i32);
    (value * scale).round() / scale
}

/// Check whether `p` lies inside `quad`, comparing areas at
/// [`DEFAULT_AREA_PRECISION`]
pub fn point_in_quad(quad: &Quad, p: Point2D) -> bool {
    point_in_quad_with_precision(quad, p, DEFAULT_AREA_PRECISION)
}

/// Check whether `p` lies inside `quad`, comparing areas rounded to `places`
/// decimal places
///
/// The reference area splits the quad along the `q0 q2` diagonal. The
/// candidate area fans four triangles from `p` to each edge. A point inside
/// (or on the boundary) produces a candidate area equal to the reference;
/// a point outside produces a strictly larger one.
pub fn point_in_quad_with_precision(quad: &Quad, p: Point2D, places: u32) -> bool {
    let [q0, q1, q2, q3] = *quad;

    let reference = round_to(
        triangle_area(q0, q1, q2) + triangle_area(q0, q3, q2),
        places,
    );

    let candidate = round_to(
        triangle_area(q0, p, q1)
            + triangle_area(q1, p, q2)
            + triangle_area(q2, p, q3)
            + triangle_area(q3, p, q0),
        places,
    );

    candidate <= reference
}

/// Build a rectangular corridor of `width` centered on the segment `from -> to`
///
/// The corners are returned in boundary order: `to - n`, `to + n`,
/// `from + n`, `from - n`, where `n` is the perpendicular of the segment
/// scaled to half the width.
///
/// Fails when the endpoints coincide (the segment has no perpendicular) or
/// when the width is negative or not finite.
pub fn build_corridor(from: Point2D, to: Point2D, width: f64) -> Result<Quad, GeometryError> {
    if !width.is_finite() || width < 0.0 {
        return Err(GeometryError::InvalidWidth(width));
    }

    let (vx, vy) = (to.x - from.x, to.y - from.y);
    let (px, py) = (vy, -vx);
    let length = px.hypot(py);
    if length == 0.0 || !length.is_finite() {
        return Err(GeometryError::CoincidentEndpoints(from));
    }

    let half = width / 2.0;
    let (nx, ny) = (half * px / length, half * py / length);

    Ok([
        Point2D::new(to.x - nx, to.y - ny),
        Point2D::new(to.x + nx, to.y + ny),
        Point2D::new(from.x + nx, from.y + ny),
        Point2D::new(from.x - nx, from.y - ny),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_positions() -> Vec<Position> {
        vec![
            Position::planar(0.0, 0.0),
            Position::planar(3.0, 4.0),
            Position::new(-7.5, 2.25, 10.0),
            Position::planar(1e6, -1e6),
            Position::planar(0.1, 0.2),
        ]
    }

    #[test]
    fn test_distance_symmetric_and_zero_on_self() {
        for a in sample_positions() {
            assert_eq!(distance(a, a), 0.0);
            for b in sample_positions() {
                assert_eq!(distance(a, b), distance(b, a));
            }
        }
    }

    #[test]
    fn test_distance_ignores_z() {
        let a = Position::new(0.0, 0.0, 0.0);
        let b = Position::new(3.0, 4.0, 100.0);
        assert_eq!(distance(a, b), 5.0);
    }

    #[test]
    fn test_triangle_area() {
        let area = triangle_area(
            Point2D::new(0.0, 0.0),
            Point2D::new(4.0, 0.0),
            Point2D::new(0.0, 3.0),
        );
        assert_eq!(area, 6.0);

        // Orientation does not matter
        let reversed = triangle_area(
            Point2D::new(0.0, 3.0),
            Point2D::new(4.0, 0.0),
            Point2D::new(0.0, 0.0),
        );
        assert_eq!(reversed, 6.0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(1.235001, 2), 1.24);
        assert_eq!(round_to(7.0, 0), 7.0);
    }

    #[test]
    fn test_corridor_corners() {
        let quad = build_corridor(Point2D::new(0.0, 0.0), Point2D::new(100.0, 0.0), 2.0).unwrap();
        assert_eq!(quad[0], Point2D::new(100.0, 1.0));
        assert_eq!(quad[1], Point2D::new(100.0, -1.0));
        assert_eq!(quad[2], Point2D::new(0.0, -1.0));
        assert_eq!(quad[3], Point2D::new(0.0, 1.0));
    }

    #[test]
    fn test_corridor_rejects_coincident_endpoints() {
        let p = Point2D::new(5.0, 5.0);
        assert_eq!(
            build_corridor(p, p, 2.0),
            Err(GeometryError::CoincidentEndpoints(p))
        );
    }

    #[test]
    fn test_corridor_rejects_bad_width() {
        let from = Point2D::new(0.0, 0.0);
        let to = Point2D::new(1.0, 0.0);
        assert!(matches!(
            build_corridor(from, to, -1.0),
            Err(GeometryError::InvalidWidth(_))
        ));
        assert!(matches!(
            build_corridor(from, to, f64::NAN),
            Err(GeometryError::InvalidWidth(_))
        ));
    }

    #[test]
    fn test_corridor_membership_scenario() {
        let quad = build_corridor(Point2D::new(0.0, 0.0), Point2D::new(100.0, 0.0), 2.0).unwrap();

        assert!(!point_in_quad(&quad, Point2D::new(50.0, 5.0)));
        assert!(point_in_quad(&quad, Point2D::new(50.0, 0.5)));
        assert!(point_in_quad(&quad, Point2D::new(0.0, 0.0)));
        assert!(!point_in_quad(&quad, Point2D::new(101.0, 0.0)));
        assert!(!point_in_quad(&quad, Point2D::new(-3.0, 0.0)));
    }

    #[test]
    fn test_midpoint_inside_for_any_width() {
        let segments = [
            (Point2D::new(0.0, 0.0), Point2D::new(100.0, 0.0)),
            (Point2D::new(-20.0, 35.0), Point2D::new(40.0, -10.0)),
            (Point2D::new(3.0, 3.0), Point2D::new(3.0, 250.0)),
            (Point2D::new(0.0, 0.0), Point2D::new(0.5, 0.25)),
        ];
        let widths = [0.0, 0.5, 1.0, 2.0, 10.0, 75.0];

        for (from, to) in segments {
            let mid = Point2D::new((from.x + to.x) / 2.0, (from.y + to.y) / 2.0);
            for width in widths {
                let quad = build_corridor(from, to, width).unwrap();
                assert!(
                    point_in_quad(&quad, mid),
                    "midpoint {} of {} -> {} not inside width {}",
                    mid,
                    from,
                    to,
                    width
                );
            }
        }
    }

    #[test]
    fn test_diagonal_corridor() {
        let quad = build_corridor(Point2D::new(0.0, 0.0), Point2D::new(10.0, 10.0), 4.0).unwrap();

        // On the centerline
        assert!(point_in_quad(&quad, Point2D::new(5.0, 5.0)));
        // One unit off the centerline (half-width is 2)
        assert!(point_in_quad(&quad, Point2D::new(5.5, 4.5)));
        // Well off the centerline
        assert!(!point_in_quad(&quad, Point2D::new(8.0, 2.0)));
    }
}
