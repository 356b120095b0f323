//! Node and link identities
//!
//! - [`NodeId`]: integer identity of a node, unique for the lifetime of a run
//! - [`FaceId`]: identifier the surrounding forwarder assigns to a link
//! - [`LinkType`]: how a face reaches its peers, which decides whether a
//!   request may be sent back out of the face it arrived on

use std::str::FromStr;

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Identity of a node
///
/// Neighbor tables are keyed and iterated by this value, so the ordering is
/// part of the contract.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a new node identity
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the underlying integer
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl FromStr for NodeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>().map(Self)
    }
}

/// Identifier of a face (link endpoint) in the surrounding forwarder
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[display("face#{_0}")]
pub struct FaceId(pub u64);

/// Link type of a face
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkType {
    /// Local application or a dedicated link to exactly one peer
    #[display("point-to-point")]
    PointToPoint,
    /// Shared medium with a fixed set of peers
    #[display("multi-access")]
    MultiAccess,
    /// Wireless ad hoc medium; peers change as nodes move
    #[display("ad-hoc")]
    AdHoc,
}

impl LinkType {
    /// Whether a request may leave through the same face it arrived on
    ///
    /// Only ad hoc links qualify: the set of nodes hearing a retransmission
    /// differs from the set that sent it.
    pub fn allows_reflection(&self) -> bool {
        matches!(self, LinkType::AdHoc)
    }
}

/// A face as seen by a strategy: its identifier plus its link type
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display("{face} ({link_type})")]
pub struct FaceEndpoint {
    pub face: FaceId,
    pub link_type: LinkType,
}

impl FaceEndpoint {
    /// Create a new face endpoint
    pub const fn new(face: FaceId, link_type: LinkType) -> Self {
        Self { face, link_type }
    }

    /// Check whether this face is a local application face
    pub fn is_point_to_point(&self) -> bool {
        self.link_type == LinkType::PointToPoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_ordering() {
        let mut ids = vec![NodeId(9), NodeId(3), NodeId(7)];
        ids.sort();
        assert_eq!(ids, vec![NodeId(3), NodeId(7), NodeId(9)]);
    }

    #[test]
    fn test_node_id_parse_and_display() {
        let id: NodeId = "42".parse().unwrap();
        assert_eq!(id, NodeId::new(42));
        assert_eq!(id.to_string(), "42");
        assert!("forty-two".parse::<NodeId>().is_err());
    }

    #[test]
    fn test_face_display() {
        let endpoint = FaceEndpoint::new(FaceId(3), LinkType::AdHoc);
        assert_eq!(endpoint.to_string(), "face#3 (ad-hoc)");
    }

    #[test]
    fn test_reflection_only_on_ad_hoc() {
        assert!(LinkType::AdHoc.allows_reflection());
        assert!(!LinkType::PointToPoint.allows_reflection());
        assert!(!LinkType::MultiAccess.allows_reflection());
    }
}
