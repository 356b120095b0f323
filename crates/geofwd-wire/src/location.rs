//! Location tag: a 3-D position attached to a message
//!
//! ```text
//! LocationTag    = LOCATION_TAG length 3LocationPos
//! LocationPos    = LOCATION_TAG_POS 8 ieee754-double   ; x, y, z in order
//! ```

use bytes::Bytes;
use geofwd_core::Position;

use crate::error::DecodeError;
use crate::tlv::{types, Block, WireCache};

/// A position carried alongside a message
///
/// Equality compares the logical position only, never the cached wire form.
#[derive(Debug, Clone)]
pub struct LocationTag {
    position: Position,
    wire: WireCache,
}

impl LocationTag {
    /// Create a tag for the given position
    pub fn new(position: Position) -> Self {
        Self {
            position,
            wire: WireCache::empty(),
        }
    }

    /// The carried position
    pub fn position(&self) -> Position {
        self.position
    }

    /// Decode a tag from its complete wire form, retaining the bytes
    pub fn decode(wire: Bytes) -> Result<Self, DecodeError> {
        let block = Block::from_wire(wire.clone())?;
        let position = Self::read_position(&block)?;
        Ok(Self {
            position,
            wire: WireCache::from_wire(wire),
        })
    }

    /// Decode a tag from an already-parsed block
    pub fn from_block(block: &Block) -> Result<Self, DecodeError> {
        let position = Self::read_position(block)?;
        Ok(Self {
            position,
            wire: WireCache::from_wire(block.to_wire()),
        })
    }

    fn read_position(block: &Block) -> Result<Position, DecodeError> {
        block.expect_type(types::LOCATION_TAG)?;
        let elements = block.elements()?;
        let [x, y, z] = elements.as_slice() else {
            return Err(DecodeError::ElementCount {
                block: "LocationTag",
                actual: elements.len(),
            });
        };

        let mut coordinates = [0.0; 3];
        for (slot, element) in coordinates.iter_mut().zip([x, y, z]) {
            *slot = element.expect_type(types::LOCATION_TAG_POS)?.read_double()?;
        }
        Ok(Position::from((coordinates[0], coordinates[1], coordinates[2])))
    }

    /// Encoded form of the tag
    ///
    /// Computed once and memoized; later calls return the same bytes.
    pub fn encode(&self) -> Bytes {
        self.wire.get_or_encode(|| self.to_block().to_wire())
    }

    /// Build the container block without touching the cache
    pub fn to_block(&self) -> Block {
        let Position { x, y, z } = self.position;
        Block::nested(
            types::LOCATION_TAG,
            &[
                Block::double(types::LOCATION_TAG_POS, x),
                Block::double(types::LOCATION_TAG_POS, y),
                Block::double(types::LOCATION_TAG_POS, z),
            ],
        )
    }

    /// Whether the wire form is already available without encoding
    pub fn has_wire(&self) -> bool {
        self.wire.get().is_some()
    }
}

impl PartialEq for LocationTag {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
    }
}

impl From<Position> for LocationTag {
    fn from(position: Position) -> Self {
        Self::new(position)
    }
}
