//! Multi-node scenarios over a shared discrete-event scheduler
//!
//! Each node owns a neighbor table, the three strategies, a discovery
//! responder and a recording host. A tiny broadcast medium delivers what a
//! node sends to every other node within radio range; tags cross the air as
//! encoded blocks and are decoded again at each receiver.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;

use geofwd_core::{distance, EventQueue, FaceEndpoint, FaceId, LinkType, NodeId, Position, Scheduler};
use geofwd_logging::{init_testing, NodeContextGuard};
use geofwd_routing::{
    apply_decision, apply_reply_decision, receive_request, BestNeighborStrategy, Decision,
    DiscoveryResponder, DropReason, ExponentialRetxSuppression, ForwardingStrategy,
    ForwardingZoneStrategy, GeoForwardConfig, HostAction, LocalNode, NeighborTable,
    NeighborhoodStrategy, RecordingHost, RejectReason, RoutingError, RoutingResult,
};
use geofwd_wire::{DecodeError, LocationTag, Request, TagSet, WireError};

/// A request on the air: everything but the tags, plus the encoded tags
type Frame = (Request, Bytes);

const APP_FACE: FaceId = FaceId(0);
const RADIO_FACE: FaceId = FaceId(1);
const RADIO_RANGE: f64 = 50.0;

fn app() -> FaceEndpoint {
    FaceEndpoint::new(APP_FACE, LinkType::PointToPoint)
}

fn radio() -> FaceEndpoint {
    FaceEndpoint::new(RADIO_FACE, LinkType::AdHoc)
}

struct Node {
    id: NodeId,
    position: Mutex<Position>,
    table: Arc<NeighborTable>,
    host: RecordingHost,
    best: BestNeighborStrategy,
    zone: ForwardingZoneStrategy,
    neighborhood: NeighborhoodStrategy,
    discovery: Arc<DiscoveryResponder>,
}

impl Node {
    fn new(id: u32, position: Position, queue: &Arc<EventQueue>, config: &GeoForwardConfig) -> Self {
        let scheduler: Arc<dyn Scheduler> = queue.clone();
        let table = Arc::new(NeighborTable::new());
        let host = RecordingHost::new();
        host.add_route("/", vec![radio()]);
        host.add_face(APP_FACE);

        Self {
            id: NodeId(id),
            position: Mutex::new(position),
            best: BestNeighborStrategy::new(table.clone(), config.best_neighbor.clone()),
            zone: ForwardingZoneStrategy::new(
                Arc::new(ExponentialRetxSuppression::new(config.suppression.clone())),
                config.zone.clone(),
            ),
            neighborhood: NeighborhoodStrategy::new(
                table.clone(),
                scheduler.clone(),
                config.neighbor.clone(),
            ),
            discovery: Arc::new(
                DiscoveryResponder::new(
                    NodeId(id),
                    position,
                    scheduler.now(),
                    config.discovery.clone(),
                )
                .with_reply_face(RADIO_FACE),
            ),
            table,
            host,
        }
    }

    fn position(&self) -> Position {
        *self.position.lock()
    }

    fn move_to(&self, position: Position) {
        *self.position.lock() = position;
    }

    fn local(&self, now: Duration) -> LocalNode {
        LocalNode::new(self.id, self.position(), now)
    }
}

struct Network {
    queue: Arc<EventQueue>,
    nodes: Vec<Node>,
}

impl Network {
    fn new(placements: &[(u32, Position)]) -> Self {
        init_testing();
        let queue = Arc::new(EventQueue::new());
        let config = GeoForwardConfig::default();
        let nodes = placements
            .iter()
            .map(|&(id, position)| Node::new(id, position, &queue, &config))
            .collect();
        Self { queue, nodes }
    }

    fn node(&self, id: u32) -> &Node {
        self.nodes
            .iter()
            .find(|node| node.id == NodeId(id))
            .unwrap()
    }

    fn in_range_of(&self, sender: &Node) -> impl Iterator<Item = &Node> {
        let origin = sender.position();
        self.nodes
            .iter()
            .filter(move |node| node.id != sender.id && distance(node.position(), origin) <= RADIO_RANGE)
    }

    /// One discovery exchange: `requester` floods, every node in range answers
    fn discover(&self, requester: u32) {
        let now = self.queue.now();
        let asking = self.node(requester);
        let request = asking.discovery.build_request();

        let answers: Vec<_> = self
            .in_range_of(asking)
            .map(|node| {
                let _ctx = NodeContextGuard::new(node.id);
                assert!(node.discovery.is_discovery(&request));
                node.discovery.respond(&request, node.position(), now)
            })
            .collect();

        let _ctx = NodeContextGuard::new(asking.id);
        for reply in answers {
            let decision = asking
                .neighborhood
                .after_receive_reply(radio(), &reply, &asking.host)
                .unwrap();
            apply_reply_decision(&asking.host, &reply, &decision);
        }
    }

    /// Take every request `sender` put on the radio, encoding its tags
    fn radio_frames(&self, sender: u32) -> Vec<Frame> {
        self.node(sender)
            .host
            .take_actions()
            .into_iter()
            .filter_map(|action| match action {
                HostAction::SendRequest { request, face } if face == RADIO_FACE => Some(request),
                _ => None,
            })
            .map(|request| {
                let wire = request.tags.encode().unwrap();
                let header = Request {
                    tags: TagSet::new(),
                    ..request
                };
                (header, wire)
            })
            .collect()
    }

    /// Hand one frame from `sender` to each node in range, best-neighbor strategy
    fn deliver(&self, sender: u32, frame: &Frame) -> Vec<(NodeId, RoutingResult<Decision>)> {
        let now = self.queue.now();
        let (header, wire) = frame;
        self.in_range_of(self.node(sender))
            .map(|node| {
                let _ctx = NodeContextGuard::new(node.id);
                let result = receive_request(
                    &node.best,
                    &node.local(now),
                    radio(),
                    header,
                    wire.clone(),
                    &node.host,
                );
                (node.id, result)
            })
            .collect()
    }

    /// Deliver every request `sender` put on the radio to the nodes in range
    fn broadcast_best_neighbor(&self, sender: u32) -> Vec<(NodeId, Decision)> {
        self.radio_frames(sender)
            .iter()
            .flat_map(|frame| self.deliver(sender, frame))
            .map(|(node, result)| (node, result.unwrap()))
            .collect()
    }
}

fn content_request() -> Request {
    let mut request = Request::new("/100/0/video", 77);
    request.tags.insert(LocationTag::new(Position::planar(100.0, 0.0)));
    request
}

#[test]
fn test_discovery_populates_tables_with_movement() {
    let net = Network::new(&[
        (1, Position::planar(0.0, 0.0)),
        (2, Position::planar(10.0, 0.0)),
        (3, Position::planar(200.0, 0.0)),
    ]);

    net.discover(1);
    net.queue.advance_to(Duration::from_secs(3));
    net.node(2).move_to(Position::planar(30.0, 0.0));
    net.discover(1);

    let table = &net.node(1).table;
    assert_eq!(table.neighbors(), vec![NodeId(2)]);
    let entry = table.get_by_id(NodeId(2)).unwrap();
    assert_eq!(entry.current, Position::planar(30.0, 0.0));
    assert_eq!(entry.previous, Position::planar(10.0, 0.0));
    assert_eq!(table.last_updated(), Some(Duration::from_secs(3)));
}

#[test]
fn test_relay_selection_and_gate_across_hops() {
    let net = Network::new(&[
        (1, Position::planar(0.0, 0.0)),
        (2, Position::planar(10.0, 0.0)),
        (3, Position::planar(-20.0, 0.0)),
    ]);

    net.discover(1);
    net.queue.advance_to(Duration::from_secs(3));
    net.node(2).move_to(Position::planar(30.0, 0.0));
    net.node(3).move_to(Position::planar(-25.0, 0.0));
    net.discover(1);

    // The consumer's request arrives from the local application
    let source = net.node(1);
    let request = content_request();
    let decision = source
        .best
        .after_receive_request(&source.local(net.queue.now()), app(), &request, &source.host)
        .unwrap();
    assert_eq!(decision.faces(), &[RADIO_FACE]);
    assert_eq!(
        decision.relays().map(|relays| relays.relays().to_vec()),
        Some(vec![NodeId(2)])
    );
    apply_decision(&source.host, APP_FACE, &request, &decision).unwrap();

    let outcomes = net.broadcast_best_neighbor(1);
    assert_eq!(outcomes.len(), 2);
    for (node, decision) in &outcomes {
        match node.0 {
            // Selected, but has no neighbors of its own yet
            2 => assert_eq!(*decision, Decision::Drop(DropReason::LocallyOptimal)),
            3 => assert_eq!(*decision, Decision::Drop(DropReason::NotSelectedRelay)),
            other => panic!("unexpected receiver {other}"),
        }
    }
    assert!(net.node(3).host.actions().contains(&HostAction::PruneInRecords {
        name: request.name.clone(),
        inbound: RADIO_FACE
    }));
}

#[test]
fn test_malformed_tags_are_dropped_at_next_hop() {
    let net = Network::new(&[
        (1, Position::planar(0.0, 0.0)),
        (2, Position::planar(10.0, 0.0)),
    ]);
    net.discover(1);
    net.queue.advance_to(Duration::from_secs(3));
    net.node(2).move_to(Position::planar(30.0, 0.0));
    net.discover(1);

    let source = net.node(1);
    let request = content_request();
    let decision = source
        .best
        .after_receive_request(&source.local(net.queue.now()), app(), &request, &source.host)
        .unwrap();
    apply_decision(&source.host, APP_FACE, &request, &decision).unwrap();

    let frames = net.radio_frames(1);
    assert_eq!(frames.len(), 1);
    let (header, wire) = &frames[0];
    assert!(header.tags.is_empty());

    // Cut off the last byte of the relay block
    let truncated = (header.clone(), wire.slice(..wire.len() - 1));
    let outcomes = net.deliver(1, &truncated);
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(
        outcomes[0].1,
        Err(RoutingError::Wire(WireError::Decode(_)))
    ));

    // A block of a type no tag uses
    let unknown = (header.clone(), Bytes::from_static(&[0x01, 0x00]));
    let outcomes = net.deliver(1, &unknown);
    assert!(matches!(
        outcomes[0].1,
        Err(RoutingError::Wire(WireError::Decode(DecodeError::UnknownTagType(1))))
    ));
    assert!(net.node(2).host.actions().is_empty());

    // The intact frame still decodes and reaches the selected relay
    let outcomes = net.deliver(1, &frames[0]);
    assert_eq!(outcomes[0].1, Ok(Decision::Drop(DropReason::LocallyOptimal)));
}

#[test]
fn test_neighbors_expire_without_refresh() {
    let net = Network::new(&[
        (1, Position::planar(0.0, 0.0)),
        (2, Position::planar(10.0, 0.0)),
    ]);

    net.discover(1);
    assert_eq!(net.node(1).table.len(), 1);

    net.queue.advance_to(Duration::from_secs(4));
    net.discover(1);
    net.queue.advance_to(Duration::from_secs(8));
    assert_eq!(net.node(1).table.len(), 1);

    net.queue.advance_to(Duration::from_secs(9));
    assert!(net.node(1).table.is_empty());

    let source = net.node(1);
    let decision = source
        .best
        .after_receive_request(&source.local(net.queue.now()), app(), &content_request(), &source.host)
        .unwrap();
    assert_eq!(decision, Decision::Drop(DropReason::LocallyOptimal));
}

#[test]
fn test_zone_flooding_inside_corridor_only() {
    let net = Network::new(&[
        (1, Position::planar(0.0, 0.0)),
        (2, Position::planar(30.0, 0.5)),
        (3, Position::planar(30.0, 5.0)),
    ]);

    let mut request = Request::new("/100/0/video", 5);
    request.tags.insert(LocationTag::new(net.node(1).position()));
    let now = net.queue.now();

    let inside = net.node(2);
    let decision = inside
        .zone
        .after_receive_request(&inside.local(now), radio(), &request, &inside.host)
        .unwrap();
    apply_decision(&inside.host, RADIO_FACE, &request, &decision).unwrap();
    assert_eq!(inside.host.sent_requests().len(), 1);

    let outside = net.node(3);
    let decision = outside
        .zone
        .after_receive_request(&outside.local(now), radio(), &request, &outside.host)
        .unwrap();
    assert_eq!(decision, Decision::Reject(RejectReason::OutOfZone));
    apply_decision(&outside.host, RADIO_FACE, &request, &decision).unwrap();
    assert_eq!(
        outside.host.actions(),
        vec![HostAction::RejectPending {
            name: request.name.clone()
        }]
    );
}

#[test]
fn test_periodic_discovery_schedule() {
    let net = Network::new(&[(1, Position::planar(0.0, 0.0))]);
    let sent = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&sent);

    let node = net.node(1);
    node.discovery.start(
        net.queue.clone(),
        Arc::new(move |request: Request| log.lock().push(request)),
    );

    net.queue.advance_to(Duration::from_millis(15_100));
    let sent = sent.lock();
    assert_eq!(sent.len(), 4);
    assert!(sent.iter().all(|request| request.hop_limit == Some(2)));
    let nonces: std::collections::HashSet<_> = sent.iter().map(|request| request.nonce).collect();
    assert!(nonces.len() > 1);
}
