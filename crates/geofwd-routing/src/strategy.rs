//! Common strategy interface
//!
//! Every strategy exposes one entry point for an arriving request. The
//! runtime supplies the node's identity, its current position and the
//! current time through [`LocalNode`], so no strategy reads ambient state.
//!
//! [`receive_request`] is the per-hop path for a request whose tags arrive
//! as wire bytes: decode, decide, apply.

use std::time::Duration;

use bytes::Bytes;
use tracing::{trace, warn};

use geofwd_core::{FaceEndpoint, FaceId, NodeId, Position};
use geofwd_wire::{Request, TagSet};

use crate::decision::{apply_decision, Decision};
use crate::error::RoutingResult;
use crate::host::ForwarderHost;

/// The node a strategy is deciding for, as of this event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalNode {
    pub id: NodeId,
    pub position: Position,
    pub now: Duration,
}

impl LocalNode {
    /// Create a new local node snapshot
    pub fn new(id: NodeId, position: Position, now: Duration) -> Self {
        Self { id, position, now }
    }
}

/// A forwarding strategy
pub trait ForwardingStrategy {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Decide what to do with a request that arrived on `inbound`
    ///
    /// Fails only when the request cannot be processed at all (a tag it
    /// depends on is missing or malformed). Declining to forward is a
    /// [`Decision`], not an error.
    fn after_receive_request(
        &self,
        node: &LocalNode,
        inbound: FaceEndpoint,
        request: &Request,
        host: &dyn ForwarderHost,
    ) -> RoutingResult<Decision>;
}

/// Handle a request that arrived on `inbound` with its tags still encoded
///
/// The tag blocks in `wire_tags` replace whatever tags `request` holds.
/// A malformed block drops the request: the error is returned and the host
/// sees no action. Otherwise `strategy` decides and the decision is applied.
pub fn receive_request(
    strategy: &dyn ForwardingStrategy,
    node: &LocalNode,
    inbound: FaceEndpoint,
    request: &Request,
    wire_tags: Bytes,
    host: &dyn ForwarderHost,
) -> RoutingResult<Decision> {
    let tags = TagSet::decode(wire_tags).inspect_err(|error| {
        warn!(
            node = %node.id,
            face = %inbound.face,
            name = %request.name,
            strategy = strategy.name(),
            %error,
            "Dropping request with malformed tags"
        );
    })?;
    let incoming = Request {
        tags,
        ..request.clone()
    };

    let decision = strategy.after_receive_request(node, inbound, &incoming, host)?;
    apply_decision(host, inbound.face, &incoming, &decision)?;
    Ok(decision)
}

/// Whether `request` may leave through `outbound` after arriving on `inbound`
///
/// A face may not send a request back out of itself unless it is an ad hoc
/// face, and the host's scope rules must allow the pair.
pub fn is_eligible(
    host: &dyn ForwarderHost,
    inbound: FaceId,
    request: &Request,
    outbound: FaceEndpoint,
) -> bool {
    if outbound.face == inbound && !outbound.link_type.allows_reflection() {
        trace!(face = %outbound.face, "Skipping inbound face");
        return false;
    }
    if host.would_violate_scope(inbound, request, outbound.face) {
        trace!(face = %outbound.face, "Skipping face blocked by scope");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RoutingError;
    use crate::host::{HostAction, RecordingHost};
    use geofwd_core::LinkType;
    use geofwd_wire::{LocationTag, WireError};

    /// Forwards on every next hop, but only requests that carry a location
    struct LocatedFlood;

    impl ForwardingStrategy for LocatedFlood {
        fn name(&self) -> &'static str {
            "located-flood"
        }

        fn after_receive_request(
            &self,
            _node: &LocalNode,
            _inbound: FaceEndpoint,
            request: &Request,
            host: &dyn ForwarderHost,
        ) -> RoutingResult<Decision> {
            if request.tags.location().is_none() {
                return Ok(Decision::Drop(crate::decision::DropReason::NoNextHop));
            }
            Ok(Decision::Forward {
                faces: host
                    .next_hops(&request.name)
                    .iter()
                    .map(|hop| hop.face)
                    .collect(),
                relays: None,
            })
        }
    }

    fn located_wire() -> Bytes {
        TagSet::new()
            .with(LocationTag::new(Position::planar(100.0, 0.0)))
            .encode()
            .unwrap()
    }

    #[test]
    fn test_receive_request_decodes_tags_before_deciding() {
        let host = RecordingHost::new();
        host.add_route("/", vec![FaceEndpoint::new(FaceId(2), LinkType::AdHoc)]);
        let node = LocalNode::new(NodeId(1), Position::default(), Duration::ZERO);
        let inbound = FaceEndpoint::new(FaceId(1), LinkType::AdHoc);

        let decision = receive_request(
            &LocatedFlood,
            &node,
            inbound,
            &Request::new("/100/0/video", 3),
            located_wire(),
            &host,
        )
        .unwrap();

        assert_eq!(decision.faces(), &[FaceId(2)]);
        let sent = host.sent_requests();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].0.tags.location().is_some());
    }

    #[test]
    fn test_receive_request_drops_malformed_tags() {
        let host = RecordingHost::new();
        host.add_route("/", vec![FaceEndpoint::new(FaceId(2), LinkType::AdHoc)]);
        let node = LocalNode::new(NodeId(1), Position::default(), Duration::ZERO);
        let inbound = FaceEndpoint::new(FaceId(1), LinkType::AdHoc);

        let wire = located_wire();
        let truncated = wire.slice(..wire.len() - 1);
        let result = receive_request(
            &LocatedFlood,
            &node,
            inbound,
            &Request::new("/100/0/video", 3),
            truncated,
            &host,
        );

        assert!(matches!(result, Err(RoutingError::Wire(WireError::Decode(_)))));
        assert_eq!(host.actions(), Vec::<HostAction>::new());
    }

    #[test]
    fn test_reflection_only_on_ad_hoc() {
        let host = RecordingHost::new();
        let request = Request::new("/a", 1);

        let ad_hoc = FaceEndpoint::new(FaceId(1), LinkType::AdHoc);
        let multi = FaceEndpoint::new(FaceId(1), LinkType::MultiAccess);
        let other = FaceEndpoint::new(FaceId(2), LinkType::MultiAccess);

        assert!(is_eligible(&host, FaceId(1), &request, ad_hoc));
        assert!(!is_eligible(&host, FaceId(1), &request, multi));
        assert!(is_eligible(&host, FaceId(1), &request, other));
    }

    #[test]
    fn test_scope_violation_blocks() {
        let host = RecordingHost::new();
        host.forbid(FaceId(1), FaceId(2));
        let request = Request::new("/a", 1);

        let out = FaceEndpoint::new(FaceId(2), LinkType::AdHoc);
        assert!(!is_eligible(&host, FaceId(1), &request, out));
        assert!(is_eligible(&host, FaceId(3), &request, out));
    }
}
