//! # Geofwd Wire
//!
//! Compact binary encoding for the metadata that rides alongside every
//! forwarded message so that downstream nodes can repeat the forwarding
//! decision.
//!
//! ## Framing
//!
//! Every field is a type-length-value block. Types and lengths are
//! variable-length numbers (1, 3, 5 or 9 bytes); unsigned integers use the
//! shortest of 1, 2, 4 or 8 big-endian bytes; floating-point values are
//! 8-byte big-endian IEEE 754 doubles. See [`tlv`].
//!
//! ## Tags
//!
//! - [`LocationTag`]: a 3-D position
//! - [`NeighborTag`]: a neighbor id with its position, exchanged during discovery
//! - [`RelayTag`]: the non-empty, ordered set of nodes chosen as relays
//!
//! A message carries at most one tag of each kind, held in a [`TagSet`].
//! Each tag keeps its encoded form once computed (or the wire bytes it was
//! decoded from), so re-encoding is a cheap reference-counted clone.
//!
//! ## Messages
//!
//! [`Request`] and [`Reply`] are the in-memory views of the name-addressed
//! messages the strategies act on.

pub mod error;
pub mod location;
pub mod message;
pub mod neighbor;
pub mod relay;
pub mod tag_set;
pub mod tlv;

// Re-export main types
pub use error::{DecodeError, EncodeError, WireError, WireResult};
pub use location::LocationTag;
pub use message::{Name, Reply, Request};
pub use neighbor::NeighborTag;
pub use relay::RelayTag;
pub use tag_set::{Tag, TagKind, TagSet};
pub use tlv::Block;
