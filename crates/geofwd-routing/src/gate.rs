//! Relay-set gate
//!
//! A request that carries a [`RelayTag`](geofwd_wire::RelayTag) may only be
//! processed by the nodes it names. Every strategy runs the gate before its
//! own selection; untagged requests pass through.

use tracing::debug;

use geofwd_core::NodeId;
use geofwd_wire::Request;

/// Result of checking a request against this node's id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// No relay set is attached; nothing to check
    Untagged,
    /// The relay set names this node
    Selected,
    /// The relay set does not name this node; drop the request
    NotSelected,
}

impl GateOutcome {
    /// Whether processing should continue
    pub fn passes(&self) -> bool {
        !matches!(self, GateOutcome::NotSelected)
    }
}

/// Check whether `node` may process `request`
pub fn check_relay_gate(node: NodeId, request: &Request) -> GateOutcome {
    match request.tags.relay() {
        None => GateOutcome::Untagged,
        Some(relays) if relays.contains(node) => GateOutcome::Selected,
        Some(relays) => {
            debug!(%node, name = %request.name, relays = ?relays.relays(), "Not a selected relay");
            GateOutcome::NotSelected
        }
    }
}
