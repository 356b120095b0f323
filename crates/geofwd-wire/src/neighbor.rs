//! Neighbor tag: a node id with the position it reported
//!
//! ```text
//! NeighborTag    = NEIGHBOR_TAG length 3NeighborPos NeighborId
//! NeighborPos    = NEIGHBOR_TAG_POS 8 ieee754-double   ; x, y, z in order
//! NeighborId     = NEIGHBOR_TAG_ID length non-negative-integer
//! ```
//!
//! The id must fit in 32 bits.

use bytes::Bytes;
use geofwd_core::{NodeId, Position};

use crate::error::DecodeError;
use crate::tlv::{types, Block, WireCache};

/// A neighbor's identity and current position, carried on discovery replies
#[derive(Debug, Clone)]
pub struct NeighborTag {
    id: NodeId,
    position: Position,
    wire: WireCache,
}

impl NeighborTag {
    /// Create a tag for the given node and position
    pub fn new(id: NodeId, position: Position) -> Self {
        Self {
            id,
            position,
            wire: WireCache::empty(),
        }
    }

    /// The reporting node
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The position the node reported
    pub fn position(&self) -> Position {
        self.position
    }

    /// Logical record as `(id, position)`
    pub fn as_pair(&self) -> (NodeId, Position) {
        (self.id, self.position)
    }

    /// Decode a tag from its complete wire form, retaining the bytes
    pub fn decode(wire: Bytes) -> Result<Self, DecodeError> {
        let block = Block::from_wire(wire.clone())?;
        let (id, position) = Self::read_fields(&block)?;
        Ok(Self {
            id,
            position,
            wire: WireCache::from_wire(wire),
        })
    }

    /// Decode a tag from an already-parsed block
    pub fn from_block(block: &Block) -> Result<Self, DecodeError> {
        let (id, position) = Self::read_fields(block)?;
        Ok(Self {
            id,
            position,
            wire: WireCache::from_wire(block.to_wire()),
        })
    }

    fn read_fields(block: &Block) -> Result<(NodeId, Position), DecodeError> {
        block.expect_type(types::NEIGHBOR_TAG)?;
        let elements = block.elements()?;
        let [x, y, z, id] = elements.as_slice() else {
            return Err(DecodeError::ElementCount {
                block: "NeighborTag",
                actual: elements.len(),
            });
        };

        let x = x.expect_type(types::NEIGHBOR_TAG_POS)?.read_double()?;
        let y = y.expect_type(types::NEIGHBOR_TAG_POS)?.read_double()?;
        let z = z.expect_type(types::NEIGHBOR_TAG_POS)?.read_double()?;
        let raw_id = id
            .expect_type(types::NEIGHBOR_TAG_ID)?
            .read_non_negative_integer()?;
        let id = u32::try_from(raw_id).map_err(|_| DecodeError::IdOutOfRange(raw_id))?;

        Ok((NodeId::new(id), Position::new(x, y, z)))
    }

    /// Encoded form of the tag, memoized after the first call
    pub fn encode(&self) -> Bytes {
        self.wire.get_or_encode(|| self.to_block().to_wire())
    }

    /// Build the container block without touching the cache
    pub fn to_block(&self) -> Block {
        let Position { x, y, z } = self.position;
        Block::nested(
            types::NEIGHBOR_TAG,
            &[
                Block::double(types::NEIGHBOR_TAG_POS, x),
                Block::double(types::NEIGHBOR_TAG_POS, y),
                Block::double(types::NEIGHBOR_TAG_POS, z),
                Block::non_negative_integer(types::NEIGHBOR_TAG_ID, u64::from(self.id.get())),
            ],
        )
    }
}

impl PartialEq for NeighborTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.position == other.position
    }
}
