//! Relay tag: the ordered set of nodes chosen to carry a request
//!
//! ```text
//! RelayTag       = RELAY_TAG length 1*RelayId
//! RelayId        = RELAY_TAG_ID length non-negative-integer
//! ```
//!
//! An empty relay set has no valid encoding. Constructing one is allowed so
//! that callers can build a set incrementally, but [`RelayTag::encode`]
//! refuses it and decoding never produces one.

use bytes::Bytes;
use geofwd_core::NodeId;

use crate::error::{DecodeError, EncodeError};
use crate::tlv::{types, Block, WireCache};

/// Relay set carried by an in-flight request
#[derive(Debug, Clone)]
pub struct RelayTag {
    relays: Vec<NodeId>,
    wire: WireCache,
}

impl RelayTag {
    /// Create a relay set, preserving the given order
    pub fn new(relays: Vec<NodeId>) -> Self {
        Self {
            relays,
            wire: WireCache::empty(),
        }
    }

    /// Relays in selection order
    pub fn relays(&self) -> &[NodeId] {
        &self.relays
    }

    /// Whether `node` was selected as a relay
    pub fn contains(&self, node: NodeId) -> bool {
        self.relays.contains(&node)
    }

    /// Number of relays
    pub fn len(&self) -> usize {
        self.relays.len()
    }

    /// Check whether the set names no relay
    pub fn is_empty(&self) -> bool {
        self.relays.is_empty()
    }

    /// Decode a tag from its complete wire form, retaining the bytes
    pub fn decode(wire: Bytes) -> Result<Self, DecodeError> {
        let block = Block::from_wire(wire.clone())?;
        let relays = Self::read_relays(&block)?;
        Ok(Self {
            relays,
            wire: WireCache::from_wire(wire),
        })
    }

    /// Decode a tag from an already-parsed block
    pub fn from_block(block: &Block) -> Result<Self, DecodeError> {
        let relays = Self::read_relays(block)?;
        Ok(Self {
            relays,
            wire: WireCache::from_wire(block.to_wire()),
        })
    }

    fn read_relays(block: &Block) -> Result<Vec<NodeId>, DecodeError> {
        block.expect_type(types::RELAY_TAG)?;
        let elements = block.elements()?;
        if elements.is_empty() {
            return Err(DecodeError::ElementCount {
                block: "RelayTag",
                actual: 0,
            });
        }

        elements
            .iter()
            .map(|element| {
                let raw = element
                    .expect_type(types::RELAY_TAG_ID)?
                    .read_non_negative_integer()?;
                u32::try_from(raw)
                    .map(NodeId::new)
                    .map_err(|_| DecodeError::IdOutOfRange(raw))
            })
            .collect()
    }

    /// Encoded form of the tag, memoized after the first call
    ///
    /// Fails for an empty set.
    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        if let Some(wire) = self.wire.get() {
            return Ok(wire.clone());
        }
        let block = self.to_block()?;
        Ok(self.wire.get_or_encode(|| block.to_wire()))
    }

    /// Build the container block without touching the cache
    pub fn to_block(&self) -> Result<Block, EncodeError> {
        if self.relays.is_empty() {
            return Err(EncodeError::EmptyRelaySet);
        }
        let ids: Vec<Block> = self
            .relays
            .iter()
            .map(|id| Block::non_negative_integer(types::RELAY_TAG_ID, u64::from(id.get())))
            .collect();
        Ok(Block::nested(types::RELAY_TAG, &ids))
    }
}

impl PartialEq for RelayTag {
    fn eq(&self, other: &Self) -> bool {
        self.relays == other.relays
    }
}

impl From<Vec<NodeId>> for RelayTag {
    fn from(relays: Vec<NodeId>) -> Self {
        Self::new(relays)
    }
}

impl FromIterator<NodeId> for RelayTag {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
