//! Error types for geofwd core

use thiserror::Error;

use crate::position::Point2D;

/// Errors raised by the geometry helpers
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("Corridor endpoints coincide at {0}")]
    CoincidentEndpoints(Point2D),

    #[error("Corridor width must be finite and non-negative, got {0}")]
    InvalidWidth(f64),
}
