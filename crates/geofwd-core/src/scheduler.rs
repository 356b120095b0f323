//! Scheduling capability and a discrete-event implementation
//!
//! The forwarding core never reads a global clock. Anything that needs the
//! current time or a deferred callback receives a [`Scheduler`].
//!
//! [`EventQueue`] is a deterministic, single-threaded implementation:
//! callbacks run only when the owner advances time, in deadline order with
//! ties broken by scheduling order. Callbacks may schedule or cancel other
//! timers while they run.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;

use derive_more::Display;
use parking_lot::Mutex;
use tracing::trace;

/// Handle to a scheduled callback
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display("timer#{_0}")]
pub struct TimerId(u64);

/// A one-shot callback run when its timer fires
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Capability to read the current time and run deferred, cancellable callbacks
pub trait Scheduler: Send + Sync {
    /// Current time, measured from the start of the run
    fn now(&self) -> Duration;

    /// Run `callback` once, `delay` from now, unless cancelled first
    fn schedule_after(&self, delay: Duration, callback: TimerCallback) -> TimerId;

    /// Cancel a pending timer
    ///
    /// Returns `true` if the timer was pending. Cancelling a timer that has
    /// already fired or was already cancelled is a no-op.
    fn cancel(&self, timer: TimerId) -> bool;

    /// Check whether a timer is still waiting to fire
    fn is_pending(&self, timer: TimerId) -> bool;
}

struct QueueState {
    now: Duration,
    next_id: u64,
    deadlines: BinaryHeap<Reverse<(Duration, u64)>>,
    callbacks: HashMap<u64, TimerCallback>,
}

/// Deterministic discrete-event scheduler
pub struct EventQueue {
    state: Mutex<QueueState>,
}

impl EventQueue {
    /// Create an empty queue at time zero
    pub fn new() -> Self {
        Self::starting_at(Duration::ZERO)
    }

    /// Create an empty queue at the given time
    pub fn starting_at(now: Duration) -> Self {
        Self {
            state: Mutex::new(QueueState {
                now,
                next_id: 0,
                deadlines: BinaryHeap::new(),
                callbacks: HashMap::new(),
            }),
        }
    }

    /// Number of timers still waiting to fire
    pub fn pending_count(&self) -> usize {
        self.state.lock().callbacks.len()
    }

    /// Deadline of the earliest pending timer
    pub fn next_deadline(&self) -> Option<Duration> {
        let mut state = self.state.lock();
        Self::prune_cancelled(&mut state);
        state.deadlines.peek().map(|Reverse((deadline, _))| *deadline)
    }

    /// Fire the earliest pending timer, moving time forward to its deadline
    ///
    /// Returns `false` when nothing is pending.
    pub fn run_next(&self) -> bool {
        let callback = {
            let mut state = self.state.lock();
            Self::prune_cancelled(&mut state);
            let Some(Reverse((deadline, id))) = state.deadlines.pop() else {
                return false;
            };
            state.now = state.now.max(deadline);
            trace!(timer = id, at = ?state.now, "Firing timer");
            state.callbacks.remove(&id)
        };

        if let Some(callback) = callback {
            callback();
        }
        true
    }

    /// Fire every timer due at or before `target`, then set the time to `target`
    ///
    /// Timers scheduled by callbacks are fired too if they fall within the
    /// window. Returns the number of callbacks run.
    pub fn advance_to(&self, target: Duration) -> usize {
        let mut fired = 0;
        while self.next_deadline().is_some_and(|deadline| deadline <= target) {
            if self.run_next() {
                fired += 1;
            }
        }

        let mut state = self.state.lock();
        state.now = state.now.max(target);
        fired
    }

    /// Advance time by `delta`, firing every timer that falls due
    pub fn advance_by(&self, delta: Duration) -> usize {
        let target = self.now().saturating_add(delta);
        self.advance_to(target)
    }

    /// Fire timers until none remain pending
    ///
    /// Stops after `limit` callbacks so that a timer which always reschedules
    /// itself cannot spin forever. Returns the number of callbacks run.
    pub fn run_until_idle(&self, limit: usize) -> usize {
        let mut fired = 0;
        while fired < limit && self.run_next() {
            fired += 1;
        }
        fired
    }

    fn prune_cancelled(state: &mut QueueState) {
        while let Some(Reverse((_, id))) = state.deadlines.peek() {
            if state.callbacks.contains_key(id) {
                break;
            }
            state.deadlines.pop();
        }
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("EventQueue")
            .field("now", &state.now)
            .field("pending", &state.callbacks.len())
            .finish()
    }
}

impl Scheduler for EventQueue {
    fn now(&self) -> Duration {
        self.state.lock().now
    }

    fn schedule_after(&self, delay: Duration, callback: TimerCallback) -> TimerId {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;

        // An unbounded delay parks the timer at the end of time
        let deadline = state.now.saturating_add(delay);
        state.deadlines.push(Reverse((deadline, id)));
        state.callbacks.insert(id, callback);
        trace!(timer = id, ?deadline, "Scheduled timer");

        TimerId(id)
    }

    fn cancel(&self, timer: TimerId) -> bool {
        self.state.lock().callbacks.remove(&timer.0).is_some()
    }

    fn is_pending(&self, timer: TimerId) -> bool {
        self.state.lock().callbacks.contains_key(&timer.0)
    }
}
