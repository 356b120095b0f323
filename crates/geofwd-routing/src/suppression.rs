//! Retransmission suppression
//!
//! A requester that does not hear a reply retransmits with the same name.
//! Flooding strategies consult a [`RetxSuppression`] oracle per outgoing face
//! so that a burst of retransmissions does not turn into a burst of floods.
//!
//! [`ExponentialRetxSuppression`] remembers, per (name, face), when the
//! request last went out and a suppression interval. A retransmission
//! arriving inside the interval is suppressed; one arriving after it is
//! forwarded and the interval grows by a constant factor up to a maximum.
//! Records idle for longer than `record_timeout` are swept while new sends
//! are recorded, at most once per timeout.

use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use geofwd_core::FaceId;
use geofwd_wire::Name;

/// Outcome of a suppression check for one outgoing face
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressionResult {
    /// The request has never been sent on this face
    New,
    /// A retransmission outside the suppression interval; send it
    Forward,
    /// A retransmission inside the suppression interval; do not send
    Suppress,
}

impl SuppressionResult {
    /// Whether the request should be sent
    pub fn should_send(&self) -> bool {
        !matches!(self, SuppressionResult::Suppress)
    }
}

/// Retransmission suppression oracle
pub trait RetxSuppression: Send + Sync {
    /// Decide whether a request for `name` may go out on `face` at `now`
    fn decide(&self, name: &Name, face: FaceId, now: Duration) -> SuppressionResult;

    /// Record that the request went out on `face` after `result` allowed it
    fn record_sent(&self, name: &Name, face: FaceId, result: SuppressionResult, now: Duration);
}

/// Parameters of [`ExponentialRetxSuppression`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuppressionConfig {
    /// Interval after the first send
    pub initial_interval: Duration,
    /// Growth factor applied each time a retransmission is forwarded
    pub multiplier: f64,
    /// Upper bound on the interval
    pub max_interval: Duration,
    /// How long an idle record is kept before it is swept
    pub record_timeout: Duration,
}

impl Default for SuppressionConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(10),
            multiplier: 2.0,
            max_interval: Duration::from_millis(250),
            record_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SendRecord {
    last_sent: Duration,
    interval: Duration,
}

/// Suppression with an exponentially growing interval per (name, face)
#[derive(Debug)]
pub struct ExponentialRetxSuppression {
    records: DashMap<(Name, FaceId), SendRecord>,
    last_sweep: Mutex<Duration>,
    config: SuppressionConfig,
}

impl ExponentialRetxSuppression {
    /// Create a suppression oracle with the given parameters
    pub fn new(config: SuppressionConfig) -> Self {
        Self {
            records: DashMap::new(),
            last_sweep: Mutex::new(Duration::ZERO),
            config,
        }
    }

    /// Current interval for a (name, face) pair, if it was ever sent
    pub fn interval(&self, name: &Name, face: FaceId) -> Option<Duration> {
        self.records
            .get(&(name.clone(), face))
            .map(|record| record.interval)
    }

    /// Forget records idle for longer than the configured timeout
    ///
    /// Returns the number of records removed.
    pub fn cleanup(&self, now: Duration) -> usize {
        let before = self.records.len();
        let timeout = self.config.record_timeout;
        self.records
            .retain(|_, record| now.saturating_sub(record.last_sent) <= timeout);
        let removed = before - self.records.len();
        if removed > 0 {
            debug!(removed, "Cleaned up suppression records");
        }
        removed
    }

    /// Run [`cleanup`](Self::cleanup) if a full timeout has passed since the last sweep
    fn sweep_if_due(&self, now: Duration) {
        {
            let mut last_sweep = self.last_sweep.lock();
            if now.saturating_sub(*last_sweep) < self.config.record_timeout {
                return;
            }
            *last_sweep = now;
        }
        self.cleanup(now);
    }

    /// Number of (name, face) pairs tracked
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn grow(&self, interval: Duration) -> Duration {
        let nanos = interval.as_nanos() as f64 * self.config.multiplier.max(1.0);
        Duration::from_nanos(nanos.round() as u64).min(self.config.max_interval)
    }
}

impl Default for ExponentialRetxSuppression {
    fn default() -> Self {
        Self::new(SuppressionConfig::default())
    }
}

impl RetxSuppression for ExponentialRetxSuppression {
    fn decide(&self, name: &Name, face: FaceId, now: Duration) -> SuppressionResult {
        let Some(record) = self.records.get(&(name.clone(), face)) else {
            return SuppressionResult::New;
        };

        if now < record.last_sent.saturating_add(record.interval) {
            trace!(%name, %face, interval = ?record.interval, "Suppressing retransmission");
            SuppressionResult::Suppress
        } else {
            SuppressionResult::Forward
        }
    }

    fn record_sent(&self, name: &Name, face: FaceId, result: SuppressionResult, now: Duration) {
        self.sweep_if_due(now);
        match result {
            SuppressionResult::New => {
                self.records.insert(
                    (name.clone(), face),
                    SendRecord {
                        last_sent: now,
                        interval: self.config.initial_interval,
                    },
                );
            }
            SuppressionResult::Forward => {
                let mut record = self
                    .records
                    .entry((name.clone(), face))
                    .or_insert(SendRecord {
                        last_sent: now,
                        interval: self.config.initial_interval,
                    });
                record.last_sent = now;
                record.interval = self.grow(record.interval);
            }
            SuppressionResult::Suppress => {}
        }
    }
}
