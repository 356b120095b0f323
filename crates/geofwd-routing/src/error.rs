//! Routing error types
//!
//! Selecting no relay and finding this node outside the forwarding zone are
//! ordinary outcomes expressed as [`Decision`](crate::Decision)s. The errors
//! here cover messages that cannot be processed at all.

use thiserror::Error;

use geofwd_core::GeometryError;
use geofwd_wire::{DecodeError, EncodeError, Name, TagKind, WireError};

/// Errors raised while processing a single message
///
/// Each error is fatal to the message that caused it and nothing else.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    /// Wire encoding or decoding failed
    #[error("Wire error: {0}")]
    Wire(#[from] WireError),

    /// A tag the strategy depends on was not attached
    #[error("Missing {0} tag")]
    MissingTag(TagKind),

    /// The request name does not start with `/<x>/<y>`
    #[error("Cannot read a destination from {0}")]
    UnparsableDestination(Name),

    /// The forwarding zone could not be built
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),
}

impl From<DecodeError> for RoutingError {
    fn from(err: DecodeError) -> Self {
        Self::Wire(WireError::Decode(err))
    }
}

impl From<EncodeError> for RoutingError {
    fn from(err: EncodeError) -> Self {
        Self::Wire(WireError::Encode(err))
    }
}

/// Result type for routing operations
pub type RoutingResult<T> = Result<T, RoutingError>;
