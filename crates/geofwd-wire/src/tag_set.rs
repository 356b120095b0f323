//! Per-message tag collection
//!
//! A message carries at most one tag of each [`TagKind`]. Tags are encoded as
//! a plain concatenation of their blocks in kind order.

use std::collections::BTreeMap;

use bytes::{Bytes, BytesMut};
use derive_more::Display;
use tracing::{debug, trace};

use crate::error::{DecodeError, EncodeError};
use crate::location::LocationTag;
use crate::neighbor::NeighborTag;
use crate::relay::RelayTag;
use crate::tlv::{types, Block};

/// Kinds of tag a message may carry
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TagKind {
    #[display("location")]
    Location,
    #[display("neighbor")]
    Neighbor,
    #[display("relay")]
    Relay,
}

impl TagKind {
    /// Outer block type of this kind
    pub fn tlv_type(&self) -> u64 {
        match self {
            TagKind::Location => types::LOCATION_TAG,
            TagKind::Neighbor => types::NEIGHBOR_TAG,
            TagKind::Relay => types::RELAY_TAG,
        }
    }

    /// Map an outer block type back to its kind
    pub fn from_tlv_type(tlv_type: u64) -> Option<Self> {
        match tlv_type {
            types::LOCATION_TAG => Some(TagKind::Location),
            types::NEIGHBOR_TAG => Some(TagKind::Neighbor),
            types::RELAY_TAG => Some(TagKind::Relay),
            _ => None,
        }
    }
}

/// One tag of any kind
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Location(LocationTag),
    Neighbor(NeighborTag),
    Relay(RelayTag),
}

impl Tag {
    /// Kind of this tag
    pub fn kind(&self) -> TagKind {
        match self {
            Tag::Location(_) => TagKind::Location,
            Tag::Neighbor(_) => TagKind::Neighbor,
            Tag::Relay(_) => TagKind::Relay,
        }
    }

    /// Encoded form of this tag
    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        match self {
            Tag::Location(tag) => Ok(tag.encode()),
            Tag::Neighbor(tag) => Ok(tag.encode()),
            Tag::Relay(tag) => tag.encode(),
        }
    }

    /// Decode a tag of whichever kind the block's type names
    pub fn from_block(block: &Block) -> Result<Self, DecodeError> {
        match TagKind::from_tlv_type(block.tlv_type()) {
            Some(TagKind::Location) => LocationTag::from_block(block).map(Tag::Location),
            Some(TagKind::Neighbor) => NeighborTag::from_block(block).map(Tag::Neighbor),
            Some(TagKind::Relay) => RelayTag::from_block(block).map(Tag::Relay),
            None => Err(DecodeError::UnknownTagType(block.tlv_type())),
        }
    }
}

impl From<LocationTag> for Tag {
    fn from(tag: LocationTag) -> Self {
        Tag::Location(tag)
    }
}

impl From<NeighborTag> for Tag {
    fn from(tag: NeighborTag) -> Self {
        Tag::Neighbor(tag)
    }
}

impl From<RelayTag> for Tag {
    fn from(tag: RelayTag) -> Self {
        Tag::Relay(tag)
    }
}

/// The tags attached to one message, at most one per kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagSet {
    tags: BTreeMap<TagKind, Tag>,
}

impl TagSet {
    /// Create an empty tag set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tag, returning the one of the same kind it replaced
    pub fn insert(&mut self, tag: impl Into<Tag>) -> Option<Tag> {
        let tag = tag.into();
        self.tags.insert(tag.kind(), tag)
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, tag: impl Into<Tag>) -> Self {
        self.insert(tag);
        self
    }

    /// Get the tag of a kind
    pub fn get(&self, kind: TagKind) -> Option<&Tag> {
        self.tags.get(&kind)
    }

    /// Remove the tag of a kind
    pub fn remove(&mut self, kind: TagKind) -> Option<Tag> {
        self.tags.remove(&kind)
    }

    /// Check whether a tag of this kind is present
    pub fn contains(&self, kind: TagKind) -> bool {
        self.tags.contains_key(&kind)
    }

    pub fn location(&self) -> Option<&LocationTag> {
        match self.tags.get(&TagKind::Location) {
            Some(Tag::Location(tag)) => Some(tag),
            _ => None,
        }
    }

    pub fn neighbor(&self) -> Option<&NeighborTag> {
        match self.tags.get(&TagKind::Neighbor) {
            Some(Tag::Neighbor(tag)) => Some(tag),
            _ => None,
        }
    }

    pub fn relay(&self) -> Option<&RelayTag> {
        match self.tags.get(&TagKind::Relay) {
            Some(Tag::Relay(tag)) => Some(tag),
            _ => None,
        }
    }

    /// Number of tags present
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterate tags in kind order
    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }

    /// Encode all tags as concatenated blocks in kind order
    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut buf = BytesMut::new();
        for (kind, tag) in &self.tags {
            let block = tag.encode().inspect_err(|error| {
                debug!(%kind, %error, "Refusing to encode tag");
            })?;
            buf.extend_from_slice(&block);
        }
        Ok(buf.freeze())
    }

    /// Decode a concatenation of tag blocks
    ///
    /// Fails on unknown block types and on a second tag of the same kind.
    pub fn decode(wire: Bytes) -> Result<Self, DecodeError> {
        let len = wire.len();
        let set = Self::decode_blocks(wire).inspect_err(|error| {
            debug!(len, %error, "Rejected malformed tag blocks");
        })?;
        trace!(len, tags = set.len(), "Decoded tag set");
        Ok(set)
    }

    fn decode_blocks(wire: Bytes) -> Result<Self, DecodeError> {
        let mut set = Self::new();
        for block in Block::parse_all(wire)? {
            let tag = Tag::from_block(&block)?;
            let kind = tag.kind();
            if set.insert(tag).is_some() {
                return Err(DecodeError::DuplicateTag(kind));
            }
        }
        Ok(set)
    }
}
