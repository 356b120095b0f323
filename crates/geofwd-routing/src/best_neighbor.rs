//! Best-neighbor relay selection
//!
//! A request carries the location of the content it asks for in its
//! [`LocationTag`](geofwd_wire::LocationTag). Each hop picks, from its
//! neighbor table, the neighbors that are both moving toward that location
//! and already closer to it than this node, and hands the request to the
//! closest of them by attaching a relay set. Only the named relays continue
//! processing; everyone else who overhears the transmission drops it.
//!
//! When no neighbor qualifies, this node is locally optimal and the request
//! is not forwarded.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use geofwd_core::{distance, FaceEndpoint, NodeId, Position};
use geofwd_wire::{RelayTag, Request, TagKind};

use crate::decision::{Decision, DropReason};
use crate::error::{RoutingError, RoutingResult};
use crate::gate::check_relay_gate;
use crate::host::ForwarderHost;
use crate::strategy::{is_eligible, ForwardingStrategy, LocalNode};
use crate::table::{NeighborEntry, NeighborTable};

/// Configuration for best-neighbor selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestNeighborConfig {
    /// Maximum number of relays named per hop
    pub relay_count: usize,
}

impl Default for BestNeighborConfig {
    fn default() -> Self {
        Self { relay_count: 1 }
    }
}

/// Pick up to `k` neighbors better placed than `self_position` to reach
/// `target`
///
/// A neighbor qualifies when its current position is no farther from the
/// target than its previous one, and no farther than this node is.
/// Qualifying neighbors are ordered by current distance to the target; ties
/// keep the order of `neighbors` (ascending node id for a table snapshot).
/// That tie-break is arbitrary.
pub fn select_best_relays(
    neighbors: &[NeighborEntry],
    self_position: Position,
    target: Position,
    k: usize,
) -> Vec<NodeId> {
    let own_distance = distance(self_position, target);

    let mut candidates: Vec<(NodeId, f64)> = neighbors
        .iter()
        .filter_map(|entry| {
            let previous = distance(entry.previous, target);
            let current = distance(entry.current, target);
            let approaching = current <= previous;
            let closer = current <= own_distance;
            trace!(
                node = %entry.id,
                previous,
                current,
                approaching,
                closer,
                "Evaluated neighbor"
            );
            (approaching && closer).then_some((entry.id, current))
        })
        .collect();

    candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
    candidates.into_iter().take(k).map(|(id, _)| id).collect()
}

/// Forward each request to the single best next hop, naming its relays
pub struct BestNeighborStrategy {
    table: Arc<NeighborTable>,
    config: BestNeighborConfig,
}

impl BestNeighborStrategy {
    /// Create a strategy reading from `table`
    pub fn new(table: Arc<NeighborTable>, config: BestNeighborConfig) -> Self {
        Self { table, config }
    }

    /// The neighbor table this strategy reads
    pub fn table(&self) -> &Arc<NeighborTable> {
        &self.table
    }

    /// Select relays from a fresh snapshot of the table
    pub fn select_relays(&self, self_position: Position, target: Position) -> Vec<NodeId> {
        select_best_relays(
            &self.table.snapshot(),
            self_position,
            target,
            self.config.relay_count,
        )
    }
}

impl ForwardingStrategy for BestNeighborStrategy {
    fn name(&self) -> &'static str {
        "best-neighbor"
    }

    fn after_receive_request(
        &self,
        node: &LocalNode,
        inbound: FaceEndpoint,
        request: &Request,
        host: &dyn ForwarderHost,
    ) -> RoutingResult<Decision> {
        let Some(out) = host.next_hops(&request.name).into_iter().next() else {
            return Ok(Decision::Drop(DropReason::NoNextHop));
        };

        if !is_eligible(host, inbound.face, request, out) {
            return Ok(Decision::Drop(DropReason::IneligibleFace));
        }

        // Local delivery needs no relay
        if out.is_point_to_point() {
            debug!(node = %node.id, name = %request.name, face = %out.face, "Delivering locally");
            return Ok(Decision::Forward {
                faces: vec![out.face],
                relays: None,
            });
        }

        if !check_relay_gate(node.id, request).passes() {
            return Ok(Decision::Drop(DropReason::NotSelectedRelay));
        }

        let target = request
            .tags
            .location()
            .ok_or(RoutingError::MissingTag(TagKind::Location))?
            .position();

        let relays = self.select_relays(node.position, target);
        if relays.is_empty() {
            debug!(node = %node.id, name = %request.name, "No better neighbor, staying local");
            return Ok(Decision::Drop(DropReason::LocallyOptimal));
        }

        debug!(node = %node.id, name = %request.name, ?relays, face = %out.face, "Selected relays");
        Ok(Decision::Forward {
            faces: vec![out.face],
            relays: Some(RelayTag::new(relays)),
        })
    }
}
