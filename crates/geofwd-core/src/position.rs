//! Reported coordinates

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A 3-D position as reported by a node
///
/// `z` is 0 for ground-plane scenarios; every distance used for forwarding is
/// planar and ignores it.
#[derive(Debug, Display, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[display("[{x}, {y}, {z}]")]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    /// Create a new position
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Create a position on the ground plane
    pub const fn planar(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Project onto the x/y plane
    pub const fn to_point(self) -> Point2D {
        Point2D {
            x: self.x,
            y: self.y,
        }
    }

    /// Check that all three coordinates are finite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Get the coordinates as a tuple
    pub const fn as_tuple(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }
}

impl From<(f64, f64, f64)> for Position {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Self { x, y, z }
    }
}

impl From<Point2D> for Position {
    fn from(p: Point2D) -> Self {
        Self::planar(p.x, p.y)
    }
}

/// A point on the x/y plane
#[derive(Debug, Display, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[display("({x}, {y})")]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    /// Create a new point
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<Position> for Point2D {
    fn from(p: Position) -> Self {
        p.to_point()
    }
}
