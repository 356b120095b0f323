//! Neighbor table with timed expiry
//!
//! The [`NeighborTable`] remembers, for each neighbor heard during
//! discovery, its current position and the position it reported one sample
//! earlier. Entries live in an arena and are addressed by a generational
//! [`EntryHandle`]: once an entry is evicted its handle goes stale, and every
//! operation given a stale handle is a no-op.
//!
//! Expiry is driven by an external [`Scheduler`]. The table never schedules
//! on its own; after an [`upsert`](NeighborTable::upsert) the caller
//! (re)arms the entry with [`schedule_expiry`](NeighborTable::schedule_expiry).
//! The expiry callback holds only a weak reference to the table plus the
//! entry handle, and evicts only if the entry still holds the timer that
//! fired, so a re-armed entry can never be removed by an older timer.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use derive_more::Display;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, trace};

use geofwd_core::{NodeId, Position, Scheduler, TimerId};

/// Stable reference to a neighbor entry
///
/// Only valid until the entry is evicted. A reused slot gets a new
/// generation, so an old handle never aliases a newer entry.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display("entry#{slot}.{generation}")]
pub struct EntryHandle {
    slot: u32,
    generation: u32,
}

/// Read-only view of one neighbor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborEntry {
    pub id: NodeId,
    /// Position reported in the most recent observation
    pub current: Position,
    /// Position the neighbor reported one sample before `current`
    pub previous: Position,
}

struct Expiry {
    timer: TimerId,
    scheduler: Arc<dyn Scheduler>,
}

struct StoredEntry {
    id: NodeId,
    current: Position,
    previous: Position,
    expiry: Option<Expiry>,
}

impl StoredEntry {
    fn view(&self) -> NeighborEntry {
        NeighborEntry {
            id: self.id,
            current: self.current,
            previous: self.previous,
        }
    }
}

struct Slot {
    generation: u32,
    entry: Option<StoredEntry>,
}

#[derive(Default)]
struct TableState {
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_id: BTreeMap<NodeId, u32>,
    last_updated: Option<Duration>,
}

impl TableState {
    fn entry(&self, handle: EntryHandle) -> Option<&StoredEntry> {
        self.slots
            .get(handle.slot as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    fn entry_mut(&mut self, handle: EntryHandle) -> Option<&mut StoredEntry> {
        self.slots
            .get_mut(handle.slot as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.entry.as_mut())
    }

    fn handle_for_slot(&self, slot: u32) -> EntryHandle {
        let generation = self.slots[slot as usize].generation;
        EntryHandle { slot, generation }
    }

    fn allocate(&mut self, entry: StoredEntry) -> EntryHandle {
        let id = entry.id;
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize].entry = Some(entry);
                slot
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                (self.slots.len() - 1) as u32
            }
        };
        self.by_id.insert(id, slot);
        self.handle_for_slot(slot)
    }

    fn remove(&mut self, handle: EntryHandle) -> Option<StoredEntry> {
        let slot = self
            .slots
            .get_mut(handle.slot as usize)
            .filter(|slot| slot.generation == handle.generation)?;
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.slot);
        self.by_id.remove(&entry.id);
        Some(entry)
    }

    fn drain(&mut self) -> Vec<StoredEntry> {
        let slots: Vec<u32> = self.by_id.values().copied().collect();
        let mut drained = Vec::with_capacity(slots.len());
        for slot in slots {
            let handle = self.handle_for_slot(slot);
            if let Some(entry) = self.remove(handle) {
                drained.push(entry);
            }
        }
        drained
    }
}

/// Per-node table of neighbors and their recent positions
///
/// Shared through an [`Arc`]; all methods take `&self`. Selection passes read
/// a [`snapshot`](Self::snapshot) and never mutate the table.
pub struct NeighborTable {
    state: RwLock<TableState>,
}

impl NeighborTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            state: RwLock::new(TableState::default()),
        }
    }

    /// Insert a neighbor or replace both of its positions
    ///
    /// Returns the entry's handle, which is unchanged when the neighbor was
    /// already present. Any pending expiry is left as is; re-arm it with
    /// [`schedule_expiry`](Self::schedule_expiry).
    pub fn upsert(
        &self,
        id: NodeId,
        current: Position,
        previous: Position,
        now: Duration,
    ) -> EntryHandle {
        let mut state = self.state.write();
        state.last_updated = Some(now);

        let existing = state.by_id.get(&id).copied();
        if let Some(slot) = existing {
            let handle = state.handle_for_slot(slot);
            if let Some(entry) = state.entry_mut(handle) {
                entry.current = current;
                entry.previous = previous;
            }
            debug!(node = %id, %current, %previous, "Updated neighbor");
            return handle;
        }

        let handle = state.allocate(StoredEntry {
            id,
            current,
            previous,
            expiry: None,
        });
        info!(node = %id, %current, %previous, %handle, "Added neighbor");
        handle
    }

    /// Arm (or re-arm) the expiry timer of an entry
    ///
    /// Cancels any timer the entry already holds, then schedules eviction
    /// after `lifetime`. Returns the new timer, or `None` if the handle is
    /// stale or the entry expired before this call returned.
    ///
    /// The scheduler is never called with the table lock held, so a
    /// scheduler that fires callbacks inline cannot deadlock on `expire`.
    pub fn schedule_expiry(
        self: &Arc<Self>,
        handle: EntryHandle,
        scheduler: &Arc<dyn Scheduler>,
        lifetime: Duration,
    ) -> Option<TimerId> {
        let id = self.state.read().entry(handle)?.id;

        let table: Weak<Self> = Arc::downgrade(self);
        let timer_slot = Arc::new(Mutex::new(None::<TimerId>));
        let fired_slot = Arc::clone(&timer_slot);
        let timer = scheduler.schedule_after(
            lifetime,
            Box::new(move || {
                let Some(timer) = *fired_slot.lock() else {
                    return;
                };
                if let Some(table) = table.upgrade() {
                    table.expire(handle, timer);
                }
            }),
        );
        *timer_slot.lock() = Some(timer);

        let installed = {
            let mut state = self.state.write();
            state.entry_mut(handle).map(|entry| {
                entry.expiry.replace(Expiry {
                    timer,
                    scheduler: Arc::clone(scheduler),
                })
            })
        };
        let Some(previous) = installed else {
            // Evicted while the timer was being armed
            scheduler.cancel(timer);
            return None;
        };
        trace!(node = %id, %timer, ?lifetime, "Armed neighbor expiry");

        if let Some(old) = &previous {
            old.scheduler.cancel(old.timer);
        }

        // The timer fired before it was installed; finish its job now
        if !scheduler.is_pending(timer) {
            self.expire(handle, timer);
        }
        self.expiry_of(handle)
    }

    /// Handle an expiry timer firing
    ///
    /// Evicts the entry only if it still holds `timer`. Returns whether an
    /// entry was removed.
    pub fn expire(&self, handle: EntryHandle, timer: TimerId) -> bool {
        let removed = {
            let mut state = self.state.write();
            let holds_timer = state
                .entry(handle)
                .and_then(|entry| entry.expiry.as_ref())
                .is_some_and(|expiry| expiry.timer == timer);
            if !holds_timer {
                trace!(%handle, %timer, "Ignoring stale expiry");
                return false;
            }
            state.remove(handle)
        };

        match removed {
            Some(entry) => {
                info!(node = %entry.id, %timer, "Neighbor expired");
                true
            }
            None => false,
        }
    }

    /// Remove an entry, cancelling its pending expiry
    ///
    /// Evicting a stale handle (including one whose entry already expired)
    /// is a no-op and returns `false`.
    pub fn evict(&self, handle: EntryHandle) -> bool {
        let removed = self.state.write().remove(handle);
        let Some(entry) = removed else {
            return false;
        };

        if let Some(expiry) = entry.expiry {
            expiry.scheduler.cancel(expiry.timer);
        }
        info!(node = %entry.id, "Evicted neighbor");
        true
    }

    /// Look up an entry by handle
    pub fn get(&self, handle: EntryHandle) -> Option<NeighborEntry> {
        self.state.read().entry(handle).map(StoredEntry::view)
    }

    /// Look up an entry by node id
    pub fn get_by_id(&self, id: NodeId) -> Option<NeighborEntry> {
        let handle = self.handle_of(id)?;
        self.get(handle)
    }

    /// Current handle of a node's entry
    pub fn handle_of(&self, id: NodeId) -> Option<EntryHandle> {
        let state = self.state.read();
        state.by_id.get(&id).map(|&slot| state.handle_for_slot(slot))
    }

    /// Timer currently armed for an entry
    pub fn expiry_of(&self, handle: EntryHandle) -> Option<TimerId> {
        self.state
            .read()
            .entry(handle)
            .and_then(|entry| entry.expiry.as_ref())
            .map(|expiry| expiry.timer)
    }

    /// Consistent copy of every entry, ascending by node id
    pub fn snapshot(&self) -> Vec<NeighborEntry> {
        let state = self.state.read();
        state
            .by_id
            .values()
            .filter_map(|&slot| state.slots[slot as usize].entry.as_ref())
            .map(StoredEntry::view)
            .collect()
    }

    /// Ids of every neighbor, ascending
    pub fn neighbors(&self) -> Vec<NodeId> {
        self.state.read().by_id.keys().copied().collect()
    }

    /// Time of the most recent upsert
    pub fn last_updated(&self) -> Option<Duration> {
        self.state.read().last_updated
    }

    /// Number of neighbors
    pub fn len(&self) -> usize {
        self.state.read().by_id.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.state.read().by_id.is_empty()
    }

    /// Remove every entry, cancelling their timers
    pub fn clear(&self) {
        let drained = self.state.write().drain();
        for entry in &drained {
            if let Some(expiry) = &entry.expiry {
                expiry.scheduler.cancel(expiry.timer);
            }
        }
        if !drained.is_empty() {
            info!(count = drained.len(), "Cleared neighbor table");
        }
    }
}

impl Default for NeighborTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NeighborTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NeighborTable")
            .field("entries", &self.snapshot())
            .field("last_updated", &self.last_updated())
            .finish()
    }
}
