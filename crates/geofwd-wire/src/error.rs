//! Wire encoding error types

use thiserror::Error;

use crate::tag_set::TagKind;

/// Errors raised while decoding wire bytes
///
/// A decode error is fatal to the message being processed and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Input ended before a complete field was read
    #[error("Truncated input: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    /// A block had a different type than the one required at this position
    #[error("Unexpected block type: expected {expected}, got {actual}")]
    UnexpectedType { expected: u64, actual: u64 },

    /// A container had the wrong number of nested elements
    #[error("Unexpected number of elements in {block}: {actual}")]
    ElementCount { block: &'static str, actual: usize },

    /// An unsigned integer value was not 1, 2, 4 or 8 bytes long
    #[error("Invalid non-negative integer length: {0}")]
    InvalidIntegerLength(usize),

    /// A floating-point value was not 8 bytes long
    #[error("Invalid double length: {0}")]
    InvalidDoubleLength(usize),

    /// A node id did not fit in 32 bits
    #[error("Node id out of range: {0}")]
    IdOutOfRange(u64),

    /// Bytes remained after the expected block
    #[error("{0} trailing bytes after block")]
    TrailingBytes(usize),

    /// A block type that does not correspond to any tag kind
    #[error("Unknown tag type: {0}")]
    UnknownTagType(u64),

    /// The same tag kind appeared twice on one message
    #[error("Duplicate {0} tag")]
    DuplicateTag(TagKind),
}

/// Errors raised while encoding
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// A relay set must name at least one relay
    #[error("Relay set must not be empty")]
    EmptyRelaySet,
}

/// Errors from the wire layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),
}

/// Result type for wire operations
pub type WireResult<T> = Result<T, WireError>;
