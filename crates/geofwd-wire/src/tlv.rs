//! Type-length-value primitives
//!
//! Variable-length numbers:
//!
//! | First byte | Total size | Value |
//! |------------|-----------|-------|
//! | 0..=252    | 1         | the byte itself |
//! | 253        | 3         | next 2 bytes, big-endian |
//! | 254        | 5         | next 4 bytes, big-endian |
//! | 255        | 9         | next 8 bytes, big-endian |
//!
//! A [`Block`] is one TLV element. Container blocks hold a concatenation of
//! nested blocks as their value.

use std::sync::OnceLock;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::DecodeError;

/// Block type numbers used by the tags
pub mod types {
    /// Container for a [`LocationTag`](crate::LocationTag)
    pub const LOCATION_TAG: u64 = 950;
    /// One coordinate of a location tag
    pub const LOCATION_TAG_POS: u64 = 951;
    /// Container for a [`NeighborTag`](crate::NeighborTag)
    pub const NEIGHBOR_TAG: u64 = 952;
    /// One coordinate of a neighbor tag
    pub const NEIGHBOR_TAG_POS: u64 = 953;
    /// Node id of a neighbor tag
    pub const NEIGHBOR_TAG_ID: u64 = 954;
    /// Container for a [`RelayTag`](crate::RelayTag)
    pub const RELAY_TAG: u64 = 955;
    /// One relay id of a relay tag
    pub const RELAY_TAG_ID: u64 = 956;
}

/// Encoded size of a variable-length number
pub fn var_number_size(value: u64) -> usize {
    match value {
        0..=252 => 1,
        253..=0xFFFF => 3,
        0x1_0000..=0xFFFF_FFFF => 5,
        _ => 9,
    }
}

/// Append a variable-length number
pub fn put_var_number(buf: &mut BytesMut, value: u64) {
    match value {
        0..=252 => buf.put_u8(value as u8),
        253..=0xFFFF => {
            buf.put_u8(253);
            buf.put_u16(value as u16);
        }
        0x1_0000..=0xFFFF_FFFF => {
            buf.put_u8(254);
            buf.put_u32(value as u32);
        }
        _ => {
            buf.put_u8(255);
            buf.put_u64(value);
        }
    }
}

/// Read a variable-length number from the front of `input`
pub fn get_var_number(input: &mut Bytes) -> Result<u64, DecodeError> {
    ensure_remaining(input, 1)?;
    let first = input.get_u8();
    let value = match first {
        0..=252 => u64::from(first),
        253 => {
            ensure_remaining(input, 2)?;
            u64::from(input.get_u16())
        }
        254 => {
            ensure_remaining(input, 4)?;
            u64::from(input.get_u32())
        }
        255 => {
            ensure_remaining(input, 8)?;
            input.get_u64()
        }
    };
    Ok(value)
}

fn ensure_remaining(input: &Bytes, needed: usize) -> Result<(), DecodeError> {
    if input.remaining() < needed {
        return Err(DecodeError::Truncated {
            needed,
            available: input.remaining(),
        });
    }
    Ok(())
}

/// A single TLV element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    tlv_type: u64,
    value: Bytes,
}

impl Block {
    /// Create a block from its type and raw value
    pub fn new(tlv_type: u64, value: Bytes) -> Self {
        Self { tlv_type, value }
    }

    /// Create a block holding an unsigned integer in its shortest form
    pub fn non_negative_integer(tlv_type: u64, value: u64) -> Self {
        let mut buf = BytesMut::with_capacity(8);
        if value <= u64::from(u8::MAX) {
            buf.put_u8(value as u8);
        } else if value <= u64::from(u16::MAX) {
            buf.put_u16(value as u16);
        } else if value <= u64::from(u32::MAX) {
            buf.put_u32(value as u32);
        } else {
            buf.put_u64(value);
        }
        Self::new(tlv_type, buf.freeze())
    }

    /// Create a block holding an 8-byte big-endian double
    pub fn double(tlv_type: u64, value: f64) -> Self {
        let mut buf = BytesMut::with_capacity(8);
        buf.put_f64(value);
        Self::new(tlv_type, buf.freeze())
    }

    /// Create a container block from nested elements
    pub fn nested(tlv_type: u64, elements: &[Block]) -> Self {
        let size = elements.iter().map(Block::encoded_size).sum();
        let mut buf = BytesMut::with_capacity(size);
        for element in elements {
            element.encode_into(&mut buf);
        }
        Self::new(tlv_type, buf.freeze())
    }

    /// Parse one block from the front of `input`, advancing past it
    pub fn parse(input: &mut Bytes) -> Result<Self, DecodeError> {
        let tlv_type = get_var_number(input)?;
        let length = get_var_number(input)?;
        let length = usize::try_from(length).map_err(|_| DecodeError::Truncated {
            needed: usize::MAX,
            available: input.remaining(),
        })?;
        ensure_remaining(input, length)?;
        let value = input.split_to(length);
        Ok(Self { tlv_type, value })
    }

    /// Parse exactly one block spanning all of `wire`
    pub fn from_wire(mut wire: Bytes) -> Result<Self, DecodeError> {
        let block = Self::parse(&mut wire)?;
        if wire.has_remaining() {
            return Err(DecodeError::TrailingBytes(wire.remaining()));
        }
        Ok(block)
    }

    /// Parse a concatenation of blocks
    pub fn parse_all(mut wire: Bytes) -> Result<Vec<Self>, DecodeError> {
        let mut blocks = Vec::new();
        while wire.has_remaining() {
            blocks.push(Self::parse(&mut wire)?);
        }
        Ok(blocks)
    }

    /// Block type number
    pub fn tlv_type(&self) -> u64 {
        self.tlv_type
    }

    /// Raw value bytes
    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// Fail unless this block has the given type
    pub fn expect_type(&self, expected: u64) -> Result<&Self, DecodeError> {
        if self.tlv_type != expected {
            return Err(DecodeError::UnexpectedType {
                expected,
                actual: self.tlv_type,
            });
        }
        Ok(self)
    }

    /// Parse the value as nested blocks
    pub fn elements(&self) -> Result<Vec<Block>, DecodeError> {
        Self::parse_all(self.value.clone())
    }

    /// Read the value as an unsigned integer
    pub fn read_non_negative_integer(&self) -> Result<u64, DecodeError> {
        let mut value = self.value.clone();
        match value.len() {
            1 => Ok(u64::from(value.get_u8())),
            2 => Ok(u64::from(value.get_u16())),
            4 => Ok(u64::from(value.get_u32())),
            8 => Ok(value.get_u64()),
            other => Err(DecodeError::InvalidIntegerLength(other)),
        }
    }

    /// Read the value as an 8-byte double
    pub fn read_double(&self) -> Result<f64, DecodeError> {
        let mut value = self.value.clone();
        if value.len() != 8 {
            return Err(DecodeError::InvalidDoubleLength(value.len()));
        }
        Ok(value.get_f64())
    }

    /// Total encoded size: type, length and value
    pub fn encoded_size(&self) -> usize {
        var_number_size(self.tlv_type) + var_number_size(self.value.len() as u64) + self.value.len()
    }

    /// Append the encoded block to `buf`
    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.reserve(self.encoded_size());
        put_var_number(buf, self.tlv_type);
        put_var_number(buf, self.value.len() as u64);
        buf.put_slice(&self.value);
    }

    /// Encode the block into a fresh buffer
    pub fn to_wire(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_size());
        self.encode_into(&mut buf);
        buf.freeze()
    }
}

/// Memoized wire form of a tag
///
/// Either empty (only the logical value exists) or holding the encoded bytes,
/// computed on first use or retained from the wire the tag was decoded from.
#[derive(Debug, Clone, Default)]
pub(crate) struct WireCache(OnceLock<Bytes>);

impl WireCache {
    pub(crate) fn empty() -> Self {
        Self(OnceLock::new())
    }

    pub(crate) fn from_wire(wire: Bytes) -> Self {
        Self(OnceLock::from(wire))
    }

    pub(crate) fn get(&self) -> Option<&Bytes> {
        self.0.get()
    }

    pub(crate) fn get_or_encode(&self, encode: impl FnOnce() -> Bytes) -> Bytes {
        self.0.get_or_init(encode).clone()
    }
}
