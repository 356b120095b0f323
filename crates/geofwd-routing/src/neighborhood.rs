//! Neighbor discovery forwarding
//!
//! Discovery requests are flooded to every eligible next hop, optionally
//! throttled by retransmission suppression. Discovery replies carry the
//! replying node's id and current position in a
//! [`NeighborTag`](geofwd_wire::NeighborTag) and its previous position in a
//! [`LocationTag`](geofwd_wire::LocationTag); every node a reply passes
//! through records the pair in its [`NeighborTable`] and arms the entry's
//! expiry.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use geofwd_core::{FaceEndpoint, Scheduler};
use geofwd_wire::{Reply, Request, TagKind};

use crate::decision::{Decision, DropReason};
use crate::error::{RoutingError, RoutingResult};
use crate::gate::check_relay_gate;
use crate::host::ForwarderHost;
use crate::strategy::{is_eligible, ForwardingStrategy, LocalNode};
use crate::suppression::{RetxSuppression, SuppressionResult};
use crate::table::NeighborTable;

/// Neighbor bookkeeping parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborConfig {
    /// How long a neighbor entry lives without being refreshed
    pub entry_lifetime: Duration,
    /// Pending-entry expiry set before a discovery reply is sent on
    pub reply_pending_expiry: Duration,
}

impl Default for NeighborConfig {
    fn default() -> Self {
        Self {
            entry_lifetime: Duration::from_secs(5),
            reply_pending_expiry: Duration::from_secs(5),
        }
    }
}

/// Flood discovery requests and learn neighbors from discovery replies
pub struct NeighborhoodStrategy {
    table: Arc<NeighborTable>,
    scheduler: Arc<dyn Scheduler>,
    suppression: Option<Arc<dyn RetxSuppression>>,
    config: NeighborConfig,
}

impl NeighborhoodStrategy {
    /// Create a strategy recording neighbors in `table`
    ///
    /// Expiry timers are armed on `scheduler`, which also supplies the
    /// update time recorded in the table.
    pub fn new(
        table: Arc<NeighborTable>,
        scheduler: Arc<dyn Scheduler>,
        config: NeighborConfig,
    ) -> Self {
        Self {
            table,
            scheduler,
            suppression: None,
            config,
        }
    }

    /// Throttle flooded retransmissions through `suppression`
    pub fn with_suppression(mut self, suppression: Arc<dyn RetxSuppression>) -> Self {
        self.suppression = Some(suppression);
        self
    }

    pub fn table(&self) -> &Arc<NeighborTable> {
        &self.table
    }

    /// Decide what to do with a reply that arrived on `inbound`
    ///
    /// A reply handed up by a local producer with an explicit next-hop face
    /// goes out on that face only and leaves the table untouched. Any other
    /// reply must carry both neighbor and location tags.
    pub fn after_receive_reply(
        &self,
        inbound: FaceEndpoint,
        reply: &Reply,
        host: &dyn ForwarderHost,
    ) -> RoutingResult<Decision> {
        if inbound.is_point_to_point() {
            if let Some(face) = reply.next_hop_face {
                if !host.has_face(face) {
                    debug!(name = %reply.name, %face, "Requested next-hop face is gone");
                    return Ok(Decision::Drop(DropReason::NoNextHop));
                }
                return Ok(Decision::SendReply {
                    faces: vec![face],
                    pending_expiry: Duration::ZERO,
                });
            }
        }

        let (id, current) = reply
            .tags
            .neighbor()
            .ok_or(RoutingError::MissingTag(TagKind::Neighbor))?
            .as_pair();
        let previous = reply
            .tags
            .location()
            .ok_or(RoutingError::MissingTag(TagKind::Location))?
            .position();

        let handle = self
            .table
            .upsert(id, current, previous, self.scheduler.now());
        self.table
            .schedule_expiry(handle, &self.scheduler, self.config.entry_lifetime);

        let faces: Vec<_> = host
            .next_hops(&reply.name)
            .into_iter()
            .map(|hop| hop.face)
            .collect();
        if faces.is_empty() {
            return Ok(Decision::Drop(DropReason::NoNextHop));
        }

        debug!(node = %id, name = %reply.name, ?faces, "Relaying discovery reply");
        Ok(Decision::SendReply {
            faces,
            pending_expiry: self.config.reply_pending_expiry,
        })
    }
}

impl ForwardingStrategy for NeighborhoodStrategy {
    fn name(&self) -> &'static str {
        "neighborhood"
    }

    fn after_receive_request(
        &self,
        node: &LocalNode,
        inbound: FaceEndpoint,
        request: &Request,
        host: &dyn ForwarderHost,
    ) -> RoutingResult<Decision> {
        if !check_relay_gate(node.id, request).passes() {
            return Ok(Decision::Drop(DropReason::NotSelectedRelay));
        }

        let hops = host.next_hops(&request.name);
        if hops.is_empty() {
            return Ok(Decision::Drop(DropReason::NoNextHop));
        }

        let mut faces = Vec::with_capacity(hops.len());
        let mut suppressed = false;
        for out in hops {
            if !is_eligible(host, inbound.face, request, out) {
                continue;
            }
            if let Some(suppression) = &self.suppression {
                let result = suppression.decide(&request.name, out.face, node.now);
                if result == SuppressionResult::Suppress {
                    suppressed = true;
                    continue;
                }
                suppression.record_sent(&request.name, out.face, result, node.now);
            }
            trace!(face = %out.face, "Flooding discovery request");
            faces.push(out.face);
        }

        if faces.is_empty() {
            let reason = if suppressed {
                DropReason::AllSuppressed
            } else {
                DropReason::IneligibleFace
            };
            return Ok(Decision::Drop(reason));
        }

        Ok(Decision::Forward {
            faces,
            relays: None,
        })
    }
}
