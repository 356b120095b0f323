//! Neighbor discovery
//!
//! Every node periodically floods a discovery request named
//! `<prefix>/<node-id>` a few hops out, and answers the discovery requests
//! it hears with a reply tagged with its id, its current position and the
//! position it reported one sampling period earlier. Nodes relaying those
//! replies learn their neighbors' movement from the two positions (see
//! [`NeighborhoodStrategy`](crate::NeighborhoodStrategy)).
//!
//! Both requests and replies leave after a small random delay so that
//! neighbors answering the same request do not collide on the medium.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use geofwd_core::{FaceId, NodeId, Position, Scheduler, TimerId};
use geofwd_wire::{LocationTag, Name, NeighborTag, Reply, Request, TagSet};

/// Discovery parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Interval between discovery requests
    pub period: Duration,
    /// Minimum spacing between two samples of this node's own position
    pub sample_period: Duration,
    /// Hops a discovery request may travel
    pub hop_limit: u8,
    /// Lifetime of a discovery request
    pub request_lifetime: Duration,
    /// Upper bound of the random send delay
    pub max_jitter: Duration,
    /// Name prefix of discovery requests
    pub prefix: String,
    /// Freshness of discovery replies
    pub reply_freshness: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(5),
            sample_period: Duration::from_secs(3),
            hop_limit: 2,
            request_lifetime: Duration::from_secs(5),
            max_jitter: Duration::from_millis(90),
            prefix: "/neighbor".to_string(),
            reply_freshness: Duration::from_secs(1),
        }
    }
}

/// Callback handing a discovery request to the forwarder
pub type RequestSink = Arc<dyn Fn(Request) + Send + Sync>;

#[derive(Debug)]
struct SampleState {
    /// Position sampled most recently
    latest: Position,
    /// Position advertised as "previous" in replies
    advertised: Position,
    /// Earliest time the next sample may be taken
    next_sample: Duration,
}

/// Per-node discovery application
pub struct DiscoveryResponder {
    node: NodeId,
    config: DiscoveryConfig,
    /// Face replies are pinned to, usually the wireless face
    reply_face: Option<FaceId>,
    samples: Mutex<SampleState>,
    round: Mutex<Option<TimerId>>,
}

impl DiscoveryResponder {
    /// Create a responder for `node`, which was at `start_position` at `start_time`
    pub fn new(
        node: NodeId,
        start_position: Position,
        start_time: Duration,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            node,
            config,
            reply_face: None,
            samples: Mutex::new(SampleState {
                latest: start_position,
                advertised: start_position,
                next_sample: start_time,
            }),
            round: Mutex::new(None),
        }
    }

    /// Pin every reply to `face`
    pub fn with_reply_face(mut self, face: FaceId) -> Self {
        self.reply_face = Some(face);
        self
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Name this node's discovery requests use
    pub fn request_name(&self) -> Name {
        Name::from(self.config.prefix.as_str()).append(self.node)
    }

    /// Whether `request` is a discovery request another node should answer
    pub fn is_discovery(&self, request: &Request) -> bool {
        let prefix = Name::from(self.config.prefix.as_str());
        request.name.starts_with(&prefix) && request.name != self.request_name()
    }

    /// Build a fresh discovery request with a random nonce
    pub fn build_request(&self) -> Request {
        Request::new(self.request_name(), rand::random::<u32>())
            .with_lifetime(self.config.request_lifetime)
            .with_hop_limit(self.config.hop_limit)
    }

    /// Answer a discovery request while standing at `current`
    ///
    /// Samples the current position when the sampling period has elapsed.
    /// The reply advertises the sample taken before the latest one, so
    /// successive replies within a period report the same movement.
    pub fn respond(&self, request: &Request, current: Position, now: Duration) -> Reply {
        let previous = {
            let mut samples = self.samples.lock();
            if now >= samples.next_sample {
                samples.next_sample =
                    samples.next_sample.saturating_add(self.config.sample_period);
                samples.advertised = samples.latest;
                samples.latest = current;
                trace!(node = %self.node, %current, "Sampled own position");
            }
            samples.advertised
        };

        debug!(node = %self.node, name = %request.name, %current, %previous, "Answering discovery");
        let tags = TagSet::new()
            .with(NeighborTag::new(self.node, current))
            .with(LocationTag::new(previous));
        let reply = Reply::new(request.name.clone())
            .with_freshness(self.config.reply_freshness)
            .with_tags(tags);
        match self.reply_face {
            Some(face) => reply.with_next_hop_face(face),
            None => reply,
        }
    }

    /// Random send delay in `[0, max_jitter)`
    pub fn jitter(&self) -> Duration {
        let max = self.config.max_jitter.as_nanos() as u64;
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(rand::rng().random_range(0..max))
    }

    /// Start sending discovery requests through `sink`
    ///
    /// The first round runs immediately, later rounds every
    /// [`period`](DiscoveryConfig::period). Each request is handed to `sink`
    /// after its own jitter. Restarting replaces the running schedule.
    pub fn start(self: &Arc<Self>, scheduler: Arc<dyn Scheduler>, sink: RequestSink) {
        self.stop(scheduler.as_ref());
        debug!(node = %self.node, period = ?self.config.period, "Starting discovery");
        Self::schedule_round(Arc::downgrade(self), scheduler, sink, Duration::ZERO);
    }

    /// Stop sending discovery requests
    ///
    /// Requests already waiting out their jitter are still sent.
    pub fn stop(&self, scheduler: &dyn Scheduler) {
        if let Some(timer) = self.round.lock().take() {
            scheduler.cancel(timer);
            debug!(node = %self.node, "Stopped discovery");
        }
    }

    /// Whether periodic discovery is running
    pub fn is_running(&self) -> bool {
        self.round.lock().is_some()
    }

    fn schedule_round(
        responder: Weak<Self>,
        scheduler: Arc<dyn Scheduler>,
        sink: RequestSink,
        delay: Duration,
    ) {
        let Some(this) = responder.upgrade() else {
            return;
        };

        let next = Arc::clone(&scheduler);
        let timer = scheduler.schedule_after(
            delay,
            Box::new(move || {
                let Some(this) = responder.upgrade() else {
                    return;
                };
                let request = this.build_request();
                let jitter = this.jitter();
                trace!(node = %this.node, name = %request.name, ?jitter, "Sending discovery request");

                let send = Arc::clone(&sink);
                next.schedule_after(jitter, Box::new(move || send(request)));

                let period = this.config.period;
                drop(this);
                Self::schedule_round(responder, next, sink, period);
            }),
        );
        *this.round.lock() = Some(timer);
    }
}

impl std::fmt::Debug for DiscoveryResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryResponder")
            .field("node", &self.node)
            .field("reply_face", &self.reply_face)
            .field("running", &self.is_running())
            .finish()
    }
}
