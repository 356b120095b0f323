//! Forwarding decisions and their execution
//!
//! Strategies compute a [`Decision`] without side effects on the forwarder;
//! [`apply_decision`] and [`apply_reply_decision`] carry it out through a
//! [`ForwarderHost`]. Keeping the two apart lets a decision be inspected,
//! logged or discarded before anything is sent.

use std::time::Duration;

use derive_more::Display;
use tracing::{debug, warn};

use geofwd_core::FaceId;
use geofwd_wire::{RelayTag, Reply, Request};

use crate::error::RoutingResult;
use crate::host::ForwarderHost;

/// Why a request was rejected back to the pending-request table
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// This node lies outside the request's forwarding zone
    #[display("out of forwarding zone")]
    OutOfZone,
}

/// Why a message was dropped without any action
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The request names a relay set that does not include this node
    #[display("not a selected relay")]
    NotSelectedRelay,
    /// No neighbor is better placed than this node
    #[display("locally optimal")]
    LocallyOptimal,
    /// No route for the name
    #[display("no next hop")]
    NoNextHop,
    /// Every next hop was the inbound face or blocked by scope
    #[display("no eligible face")]
    IneligibleFace,
    /// Every eligible face suppressed the retransmission
    #[display("all faces suppressed")]
    AllSuppressed,
}

/// What to do with a message
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Send the request on `faces`, attaching `relays` when present
    Forward {
        faces: Vec<FaceId>,
        relays: Option<RelayTag>,
    },
    /// Tell the pending-request table to drop the request
    Reject(RejectReason),
    /// Do nothing
    Drop(DropReason),
    /// Send the reply on `faces` after resetting the pending entry's expiry
    SendReply {
        faces: Vec<FaceId>,
        pending_expiry: Duration,
    },
}

impl Decision {
    /// Check if this decision sends anything
    pub fn is_forwarding(&self) -> bool {
        match self {
            Decision::Forward { faces, .. } | Decision::SendReply { faces, .. } => !faces.is_empty(),
            Decision::Reject(_) | Decision::Drop(_) => false,
        }
    }

    /// Faces the message goes out on
    pub fn faces(&self) -> &[FaceId] {
        match self {
            Decision::Forward { faces, .. } | Decision::SendReply { faces, .. } => faces.as_slice(),
            Decision::Reject(_) | Decision::Drop(_) => &[],
        }
    }

    /// Relay set attached to a forwarded request
    pub fn relays(&self) -> Option<&RelayTag> {
        match self {
            Decision::Forward { relays, .. } => relays.as_ref(),
            _ => None,
        }
    }

    /// Get the drop reason if this is a drop decision
    pub fn drop_reason(&self) -> Option<DropReason> {
        match self {
            Decision::Drop(reason) => Some(*reason),
            _ => None,
        }
    }

    /// Get the reject reason if this is a reject decision
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            Decision::Reject(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// Carry out a decision taken for a request that arrived on `inbound`
///
/// A relay set is encoded before anything is sent, so an empty set fails
/// the whole decision instead of emitting an invalid tag.
pub fn apply_decision(
    host: &dyn ForwarderHost,
    inbound: FaceId,
    request: &Request,
    decision: &Decision,
) -> RoutingResult<()> {
    match decision {
        Decision::Forward { faces, relays } => {
            let outgoing = match relays {
                Some(relays) => {
                    relays.encode()?;
                    let mut tagged = request.clone();
                    tagged.tags.insert(relays.clone());
                    tagged
                }
                None => request.clone(),
            };
            for &face in faces {
                host.send_request(&outgoing, face);
            }
            debug!(name = %request.name, ?faces, relays = ?relays.as_ref().map(RelayTag::relays), "Forwarded request");
        }
        Decision::Reject(reason) => {
            host.reject_pending(request);
            debug!(name = %request.name, %reason, "Rejected request");
        }
        Decision::Drop(reason) => {
            if *reason == DropReason::NotSelectedRelay {
                host.prune_in_records(request, inbound);
            }
            debug!(name = %request.name, %reason, "Dropped request");
        }
        Decision::SendReply { .. } => {
            warn!(name = %request.name, "Ignoring reply decision for a request");
        }
    }
    Ok(())
}

/// Carry out a decision taken for a reply
pub fn apply_reply_decision(host: &dyn ForwarderHost, reply: &Reply, decision: &Decision) {
    match decision {
        Decision::SendReply {
            faces,
            pending_expiry,
        } => {
            for &face in faces {
                host.set_expiry(&reply.name, *pending_expiry);
                host.send_reply(reply, face);
            }
            debug!(name = %reply.name, ?faces, "Sent reply");
        }
        Decision::Drop(reason) => {
            debug!(name = %reply.name, %reason, "Dropped reply");
        }
        Decision::Forward { .. } | Decision::Reject(_) => {
            warn!(name = %reply.name, "Ignoring request decision for a reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostAction, RecordingHost};
    use geofwd_core::NodeId;
    use geofwd_wire::{EncodeError, WireError};

    use crate::error::RoutingError;

    #[test]
    fn test_forward_attaches_relays() {
        let host = RecordingHost::new();
        let request = Request::new("/a", 1);
        let decision = Decision::Forward {
            faces: vec![FaceId(2)],
            relays: Some(RelayTag::new(vec![NodeId(7)])),
        };

        apply_decision(&host, FaceId(1), &request, &decision).unwrap();

        let sent = host.sent_requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, FaceId(2));
        assert_eq!(
            sent[0].0.tags.relay().map(|r| r.relays().to_vec()),
            Some(vec![NodeId(7)])
        );
        // The caller's request is untouched
        assert!(request.tags.relay().is_none());
    }

    #[test]
    fn test_forward_replaces_previous_relays() {
        let host = RecordingHost::new();
        let mut request = Request::new("/a", 1);
        request.tags.insert(RelayTag::new(vec![NodeId(3), NodeId(5)]));
        let decision = Decision::Forward {
            faces: vec![FaceId(2)],
            relays: Some(RelayTag::new(vec![NodeId(9)])),
        };

        apply_decision(&host, FaceId(1), &request, &decision).unwrap();
        let sent = host.sent_requests();
        assert_eq!(
            sent[0].0.tags.relay().map(|r| r.relays().to_vec()),
            Some(vec![NodeId(9)])
        );
    }

    #[test]
    fn test_empty_relay_set_fails_before_sending() {
        let host = RecordingHost::new();
        let request = Request::new("/a", 1);
        let decision = Decision::Forward {
            faces: vec![FaceId(2)],
            relays: Some(RelayTag::new(Vec::new())),
        };

        assert_eq!(
            apply_decision(&host, FaceId(1), &request, &decision),
            Err(RoutingError::Wire(WireError::Encode(EncodeError::EmptyRelaySet)))
        );
        assert!(host.actions().is_empty());
    }

    #[test]
    fn test_reject_and_drop() {
        let host = RecordingHost::new();
        let request = Request::new("/a", 1);

        apply_decision(&host, FaceId(1), &request, &Decision::Reject(RejectReason::OutOfZone)).unwrap();
        apply_decision(&host, FaceId(1), &request, &Decision::Drop(DropReason::LocallyOptimal)).unwrap();
        apply_decision(&host, FaceId(1), &request, &Decision::Drop(DropReason::NotSelectedRelay)).unwrap();

        assert_eq!(
            host.actions(),
            vec![
                HostAction::RejectPending {
                    name: request.name.clone()
                },
                HostAction::PruneInRecords {
                    name: request.name.clone(),
                    inbound: FaceId(1)
                },
            ]
        );
    }

    #[test]
    fn test_reply_decision() {
        let host = RecordingHost::new();
        let reply = Reply::new("/neighbor/3");
        let decision = Decision::SendReply {
            faces: vec![FaceId(1), FaceId(2)],
            pending_expiry: Duration::from_secs(5),
        };

        apply_reply_decision(&host, &reply, &decision);
        assert_eq!(host.sent_replies().len(), 2);
        assert!(host.actions().contains(&HostAction::SetExpiry {
            name: reply.name.clone(),
            after: Duration::from_secs(5)
        }));
    }

    #[test]
    fn test_decision_accessors() {
        let forward = Decision::Forward {
            faces: vec![FaceId(1)],
            relays: None,
        };
        assert!(forward.is_forwarding());
        assert_eq!(forward.faces(), &[FaceId(1)]);
        assert!(forward.relays().is_none());

        let dropped = Decision::Drop(DropReason::AllSuppressed);
        assert!(!dropped.is_forwarding());
        assert_eq!(dropped.drop_reason(), Some(DropReason::AllSuppressed));
        assert_eq!(DropReason::LocallyOptimal.to_string(), "locally optimal");
    }
}
