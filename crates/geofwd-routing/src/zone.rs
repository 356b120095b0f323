//! Geometric forwarding-zone strategy
//!
//! A request is relayed only by nodes inside a corridor between the
//! requester and the content. The requester's position travels in the
//! request's [`LocationTag`](geofwd_wire::LocationTag); the content's
//! position is read from the first two name components (`/<x>/<y>/...`).
//!
//! Nodes inside the corridor flood the request on every eligible face,
//! subject to retransmission suppression. Nodes outside reject it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use geofwd_core::{
    build_corridor, distance, point_in_quad_with_precision, FaceEndpoint, GeometryError, Point2D,
    Position, DEFAULT_AREA_PRECISION,
};
use geofwd_wire::{Request, TagKind};

use crate::decision::{Decision, DropReason, RejectReason};
use crate::error::{RoutingError, RoutingResult};
use crate::gate::check_relay_gate;
use crate::host::ForwarderHost;
use crate::strategy::{is_eligible, ForwardingStrategy, LocalNode};
use crate::suppression::{RetxSuppression, SuppressionResult};

/// Shape of the forwarding zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Corridor width
    pub width: f64,
    /// Decimal places kept when comparing areas in the containment test
    pub area_precision: u32,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            width: 2.0,
            area_precision: DEFAULT_AREA_PRECISION,
        }
    }
}

/// Check whether `point` lies in the corridor of `config.width` from
/// `origin` to `destination`
///
/// When origin and destination coincide the corridor degenerates to a disc
/// of diameter `width` around them.
pub fn in_zone(
    origin: Point2D,
    destination: Point2D,
    point: Point2D,
    config: &ZoneConfig,
) -> Result<bool, GeometryError> {
    match build_corridor(origin, destination, config.width) {
        Ok(quad) => Ok(point_in_quad_with_precision(
            &quad,
            point,
            config.area_precision,
        )),
        Err(GeometryError::CoincidentEndpoints(_)) => {
            Ok(distance(Position::from(origin), Position::from(point)) <= config.width / 2.0)
        }
        Err(err) => Err(err),
    }
}

/// Flood requests inside the corridor between requester and content
pub struct ForwardingZoneStrategy {
    suppression: Arc<dyn RetxSuppression>,
    config: ZoneConfig,
}

impl ForwardingZoneStrategy {
    /// Create a strategy consulting `suppression` before each send
    pub fn new(suppression: Arc<dyn RetxSuppression>, config: ZoneConfig) -> Self {
        Self {
            suppression,
            config,
        }
    }

    pub fn config(&self) -> &ZoneConfig {
        &self.config
    }
}

impl ForwardingStrategy for ForwardingZoneStrategy {
    fn name(&self) -> &'static str {
        "forwarding-zone"
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

        let origin = request
            .tags
            .location()
            .ok_or(RoutingError::MissingTag(TagKind::Location))?
            .position()
            .to_point();
        let destination = request
            .name
            .leading_coordinates()
            .ok_or_else(|| RoutingError::UnparsableDestination(request.name.clone()))?;

        if !in_zone(origin, destination, node.position.to_point(), &self.config)? {
            debug!(
                node = %node.id,
                name = %request.name,
                position = %node.position,
                %origin,
                %destination,
                "Outside forwarding zone"
            );
            return Ok(Decision::Reject(RejectReason::OutOfZone));
        }

        let hops = host.next_hops(&request.name);
        if hops.is_empty() {
            return Ok(Decision::Drop(DropReason::NoNextHop));
        }

        let mut faces = Vec::with_capacity(hops.len());
        let mut suppressed = false;
        for out in hops {
            let result = self.suppression.decide(&request.name, out.face, node.now);
            if result == SuppressionResult::Suppress {
                suppressed = true;
                continue;
            }
            if !is_eligible(host, inbound.face, request, out) {
                continue;
            }
            self.suppression
                .record_sent(&request.name, out.face, result, node.now);
            trace!(face = %out.face, ?result, "Flooding in zone");
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

        debug!(node = %node.id, name = %request.name, ?faces, "Forwarding inside zone");
        Ok(Decision::Forward {
            faces,
            relays: None,
        })
    }
}
