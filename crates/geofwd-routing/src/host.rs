//! Contract with the surrounding forwarder
//!
//! Strategies never own the pending-request table, the name-prefix routes or
//! the faces. They reach them through a [`ForwarderHost`].
//!
//! [`RecordingHost`] is an in-memory host with a static route table that
//! records every action it is asked to perform. Simulations and tests drive
//! strategies through it.

use std::collections::HashSet;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use geofwd_core::{FaceEndpoint, FaceId};
use geofwd_wire::{Name, Reply, Request};

/// Operations a strategy may ask of the forwarder
pub trait ForwarderHost {
    /// Next hops registered for the longest matching prefix of `name`, in
    /// preference order
    fn next_hops(&self, name: &Name) -> Vec<FaceEndpoint>;

    /// Whether sending `request` from `inbound` out of `outbound` would break
    /// a scope rule (for example, leaking a local-only name)
    fn would_violate_scope(&self, inbound: FaceId, request: &Request, outbound: FaceId) -> bool;

    /// Whether a face with this id currently exists
    fn has_face(&self, face: FaceId) -> bool;

    /// Transmit a request on a face
    fn send_request(&self, request: &Request, face: FaceId);

    /// Tell the pending-request table to drop `request` without waiting for
    /// a reply
    fn reject_pending(&self, request: &Request);

    /// Reset the expiry of the pending entry for `name`
    fn set_expiry(&self, name: &Name, after: Duration);

    /// Transmit a reply on a face
    fn send_reply(&self, reply: &Reply, face: FaceId);

    /// Drop redundant inbound records for a request this node will not relay
    ///
    /// Hosts without per-face inbound records can ignore this.
    fn prune_in_records(&self, _request: &Request, _inbound: FaceId) {}
}

/// One action performed through a [`RecordingHost`]
#[derive(Debug, Clone, PartialEq)]
pub enum HostAction {
    SendRequest { request: Request, face: FaceId },
    RejectPending { name: Name },
    SetExpiry { name: Name, after: Duration },
    SendReply { reply: Reply, face: FaceId },
    PruneInRecords { name: Name, inbound: FaceId },
}

/// In-memory [`ForwarderHost`] that records what it is asked to do
#[derive(Debug, Default)]
pub struct RecordingHost {
    routes: Mutex<Vec<(Name, Vec<FaceEndpoint>)>>,
    faces: Mutex<HashSet<FaceId>>,
    scope_violations: Mutex<HashSet<(FaceId, FaceId)>>,
    actions: Mutex<Vec<HostAction>>,
}

impl RecordingHost {
    /// Create a host with no routes
    pub fn new() -> Self {
        Self::default()
    }

    /// Register next hops for a prefix
    pub fn add_route(&self, prefix: impl Into<Name>, next_hops: Vec<FaceEndpoint>) {
        let mut faces = self.faces.lock();
        faces.extend(next_hops.iter().map(|hop| hop.face));
        self.routes.lock().push((prefix.into(), next_hops));
    }

    /// Register a face that is not a next hop for any prefix
    pub fn add_face(&self, face: FaceId) {
        self.faces.lock().insert(face);
    }

    /// Forbid sending from `inbound` out of `outbound`
    pub fn forbid(&self, inbound: FaceId, outbound: FaceId) {
        self.scope_violations.lock().insert((inbound, outbound));
    }

    /// Everything recorded so far, in order
    pub fn actions(&self) -> Vec<HostAction> {
        self.actions.lock().clone()
    }

    /// Drain the recorded actions
    pub fn take_actions(&self) -> Vec<HostAction> {
        std::mem::take(&mut *self.actions.lock())
    }

    /// Requests sent so far, with the face each went out on
    pub fn sent_requests(&self) -> Vec<(Request, FaceId)> {
        self.actions
            .lock()
            .iter()
            .filter_map(|action| match action {
                HostAction::SendRequest { request, face } => Some((request.clone(), *face)),
                _ => None,
            })
            .collect()
    }

    /// Replies sent so far, with the face each went out on
    pub fn sent_replies(&self) -> Vec<(Reply, FaceId)> {
        self.actions
            .lock()
            .iter()
            .filter_map(|action| match action {
                HostAction::SendReply { reply, face } => Some((reply.clone(), *face)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, action: HostAction) {
        trace!(?action, "Host action");
        self.actions.lock().push(action);
    }
}

impl ForwarderHost for RecordingHost {
    fn next_hops(&self, name: &Name) -> Vec<FaceEndpoint> {
        self.routes
            .lock()
            .iter()
            .filter(|(prefix, _)| name.starts_with(prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, hops)| hops.clone())
            .unwrap_or_default()
    }

    fn would_violate_scope(&self, inbound: FaceId, _request: &Request, outbound: FaceId) -> bool {
        self.scope_violations.lock().contains(&(inbound, outbound))
    }

    fn has_face(&self, face: FaceId) -> bool {
        self.faces.lock().contains(&face)
    }

    fn send_request(&self, request: &Request, face: FaceId) {
        self.record(HostAction::SendRequest {
            request: request.clone(),
            face,
        });
    }

    fn reject_pending(&self, request: &Request) {
        self.record(HostAction::RejectPending {
            name: request.name.clone(),
        });
    }

    fn set_expiry(&self, name: &Name, after: Duration) {
        self.record(HostAction::SetExpiry {
            name: name.clone(),
            after,
        });
    }

    fn send_reply(&self, reply: &Reply, face: FaceId) {
        self.record(HostAction::SendReply {
            reply: reply.clone(),
            face,
        });
    }

    fn prune_in_records(&self, request: &Request, inbound: FaceId) {
        self.record(HostAction::PruneInRecords {
            name: request.name.clone(),
            inbound,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geofwd_core::LinkType;

    fn hop(face: u64, link_type: LinkType) -> FaceEndpoint {
        FaceEndpoint::new(FaceId(face), link_type)
    }

    #[test]
    fn test_longest_prefix_match() {
        let host = RecordingHost::new();
        host.add_route("/", vec![hop(1, LinkType::AdHoc)]);
        host.add_route("/neighbor", vec![hop(2, LinkType::PointToPoint)]);

        assert_eq!(
            host.next_hops(&Name::from("/neighbor/4")),
            vec![hop(2, LinkType::PointToPoint)]
        );
        assert_eq!(
            host.next_hops(&Name::from("/100/0/data")),
            vec![hop(1, LinkType::AdHoc)]
        );
    }

    #[test]
    fn test_no_route() {
        let host = RecordingHost::new();
        host.add_route("/video", vec![hop(1, LinkType::AdHoc)]);
        assert!(host.next_hops(&Name::from("/audio")).is_empty());
    }

    #[test]
    fn test_faces_and_scope() {
        let host = RecordingHost::new();
        host.add_route("/", vec![hop(1, LinkType::AdHoc)]);
        host.add_face(FaceId(9));
        host.forbid(FaceId(9), FaceId(1));

        assert!(host.has_face(FaceId(1)));
        assert!(host.has_face(FaceId(9)));
        assert!(!host.has_face(FaceId(2)));

        let request = Request::new("/a", 1);
        assert!(host.would_violate_scope(FaceId(9), &request, FaceId(1)));
        assert!(!host.would_violate_scope(FaceId(1), &request, FaceId(9)));
    }

    #[test]
    fn test_records_actions_in_order() {
        let host = RecordingHost::new();
        let request = Request::new("/a", 1);

        host.send_request(&request, FaceId(1));
        host.reject_pending(&request);
        host.set_expiry(&request.name, Duration::ZERO);

        let actions = host.take_actions();
        assert_eq!(actions.len(), 3);
        assert!(matches!(actions[0], HostAction::SendRequest { face: FaceId(1), .. }));
        assert!(matches!(actions[1], HostAction::RejectPending { .. }));
        assert!(host.actions().is_empty());
    }
}
