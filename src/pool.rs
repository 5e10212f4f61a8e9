//! Fixed-capacity registry of worker slots.
//!
//! Every slot is either available or busy with exactly one live worker bound
//! to it. All bookkeeping lives behind one mutex; callers take the guard with
//! [`SlotPool::lock`] and do their whole check-acquire-spawn sequence on it
//! before letting go, so no other thread can observe a slot that is marked
//! busy but has no worker yet.
//!
//! The guard is never re-acquired by a thread that already holds it: the
//! dispatcher drops it before walking inline, and a finishing worker takes it
//! fresh in [`SlotPool::release`]. A plain `Mutex` is therefore enough.

use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, trace, warn};

use crate::error::FindError;

/// Largest pool a caller may ask for.
pub const MAX_CAPACITY: usize = 255;

// ---------------------------------------------------------------------------
// Slot identity
// ---------------------------------------------------------------------------

/// Index of a slot in its pool, in `[0, capacity)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(usize);

impl SlotId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which execution unit runs a traversal: the thread that started the
/// search, or a worker bound to a pool slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOwner {
    Main,
    Worker(SlotId),
}

impl fmt::Display for SlotOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotOwner::Main         => f.write_str("main"),
            SlotOwner::Worker(slot) => write!(f, "slot {slot}"),
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

struct Slot {
    available: bool,
    worker:    Option<JoinHandle<()>>,
}

struct PoolState {
    slots:     Vec<Slot>,
    available: usize,
    busy:      usize,
    peak_busy: usize,
    spawned:   usize,
    /// Handles displaced when a slot was re-bound; joined at drain time.
    retired:   Vec<(SlotId, JoinHandle<()>)>,
}

/// The shared slot registry. Hand it around as `Arc<SlotPool>`.
pub struct SlotPool {
    state:    Mutex<PoolState>,
    /// Signalled every time a worker releases its slot.
    idle:     Condvar,
    capacity: usize,
}

impl fmt::Debug for SlotPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotPool")
            .field("capacity", &self.capacity)
            .field("state", &self.snapshot())
            .finish()
    }
}

impl SlotPool {
    /// Create a pool of `capacity` slots, all available.
    ///
    /// `capacity == 0` is valid: nothing can ever be offloaded and every
    /// traversal runs inline.
    ///
    /// # Errors
    ///
    /// [`FindError::CapacityExceeded`] if `capacity > MAX_CAPACITY`.
    pub fn new(capacity: usize) -> Result<Self, FindError> {
        if capacity > MAX_CAPACITY {
            return Err(FindError::CapacityExceeded {
                requested: capacity,
                max:       MAX_CAPACITY,
            });
        }

        let slots = (0..capacity)
            .map(|_| Slot { available: true, worker: None })
            .collect();

        Ok(Self {
            state: Mutex::new(PoolState {
                slots,
                available: capacity,
                busy:      0,
                peak_busy: 0,
                spawned:   0,
                retired:   Vec::new(),
            }),
            idle: Condvar::new(),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Take the pool guard.
    pub fn lock(&self) -> Result<PoolGuard<'_>, FindError> {
        Ok(PoolGuard { state: self.state.lock()? })
    }

    /// Worker-side completion: mark `slot` available again and wake the
    /// drain loop.
    ///
    /// Runs from a drop guard, possibly while unwinding, so a poisoned lock
    /// is recovered rather than reported.
    pub fn release(&self, slot: SlotId) {
        let mut guard = PoolGuard {
            state: self.state.lock().unwrap_or_else(PoisonError::into_inner),
        };
        if guard.mark_available(slot) {
            debug!(%slot, available = guard.available_count(), "slot released");
        } else {
            warn!(%slot, "release of a slot that was not busy");
        }
        drop(guard);
        self.idle.notify_all();
    }

    /// Consistent copy of the bookkeeping.
    pub fn snapshot(&self) -> PoolSnapshot {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        PoolSnapshot {
            capacity:  self.capacity,
            available: state.available,
            busy:      state.busy,
            peak_busy: state.peak_busy,
            spawned:   state.spawned,
            slots:     state.slots.iter().map(|s| s.available).collect(),
        }
    }

    /// Join every worker, including ones spawned while this runs.
    ///
    /// Blocks until no slot is busy. Workers keep discovering directories and
    /// offloading them while the drain is in progress, so the busy set is
    /// re-scanned after every join. Handles of workers that already released
    /// their slot are joined last.
    pub fn join_busy(&self) -> Result<JoinSummary, FindError> {
        let mut summary = JoinSummary::default();
        let mut state = self.state.lock()?;

        loop {
            let next = state
                .slots
                .iter_mut()
                .enumerate()
                .filter(|(_, s)| !s.available)
                .find_map(|(i, s)| s.worker.take().map(|h| (SlotId(i), h)));

            if let Some((slot, handle)) = next {
                drop(state);
                trace!(%slot, "joining worker");
                summary.record(slot, handle.join());
                state = self.state.lock()?;
                continue;
            }

            if state.busy == 0 {
                break;
            }
            state = self.idle.wait(state)?;
        }

        let mut leftovers: Vec<(SlotId, JoinHandle<()>)> = state.retired.drain(..).collect();
        leftovers.extend(
            state
                .slots
                .iter_mut()
                .enumerate()
                .filter_map(|(i, s)| s.worker.take().map(|h| (SlotId(i), h))),
        );
        drop(state);

        for (slot, handle) in leftovers {
            summary.record(slot, handle.join());
        }

        Ok(summary)
    }
}

// ---------------------------------------------------------------------------
// PoolGuard
// ---------------------------------------------------------------------------

/// Exclusive access to the slot bookkeeping. Dropping it releases the lock.
pub struct PoolGuard<'a> {
    state: MutexGuard<'a, PoolState>,
}

impl PoolGuard<'_> {
    pub fn available_count(&self) -> usize {
        self.state.available
    }

    pub fn busy_count(&self) -> usize {
        self.state.busy
    }

    /// The lowest-indexed available slot, or `None` when every slot is busy.
    /// Does not change any state.
    pub fn acquire_free_slot(&self) -> Option<SlotId> {
        self.state
            .slots
            .iter()
            .position(|s| s.available)
            .map(SlotId)
    }

    /// Flip `slot` from available to busy.
    ///
    /// Returns `false` and changes nothing if the slot is out of range or
    /// already busy.
    pub fn mark_busy(&mut self, slot: SlotId) -> bool {
        let state = &mut *self.state;
        match state.slots.get_mut(slot.0) {
            Some(s) if s.available => {
                s.available = false;
                state.available -= 1;
                state.busy += 1;
                state.peak_busy = state.peak_busy.max(state.busy);
                true
            }
            _ => false,
        }
    }

    /// Flip `slot` from busy to available.
    ///
    /// Returns `false` and changes nothing if the slot is out of range or
    /// already available.
    pub fn mark_available(&mut self, slot: SlotId) -> bool {
        let state = &mut *self.state;
        match state.slots.get_mut(slot.0) {
            Some(s) if !s.available => {
                s.available = true;
                state.available += 1;
                state.busy -= 1;
                true
            }
            _ => false,
        }
    }

    /// Attach the worker running in `slot`.
    pub fn bind_worker(&mut self, slot: SlotId, handle: JoinHandle<()>) {
        let state = &mut *self.state;
        if let Some(s) = state.slots.get_mut(slot.0) {
            if let Some(previous) = s.worker.replace(handle) {
                state.retired.push((slot, previous));
            }
            state.spawned += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

/// Point-in-time copy of the pool bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub capacity:  usize,
    pub available: usize,
    pub busy:      usize,
    /// Highest number of slots ever busy at once.
    pub peak_busy: usize,
    /// Workers started over the pool's lifetime.
    pub spawned:   usize,
    /// Availability of each slot, by index.
    pub slots:     Vec<bool>,
}

impl PoolSnapshot {
    /// `available + busy == capacity` and `available` agrees with the slots.
    pub fn is_consistent(&self) -> bool {
        self.available + self.busy == self.capacity
            && self.slots.len() == self.capacity
            && self.slots.iter().filter(|a| **a).count() == self.available
    }

    /// No slot is busy.
    pub fn is_idle(&self) -> bool {
        self.busy == 0 && self.slots.iter().all(|a| *a)
    }
}

/// Outcome of [`SlotPool::join_busy`].
#[derive(Debug, Default)]
pub struct JoinSummary {
    /// Worker threads joined.
    pub joined:   usize,
    /// Slots whose worker panicked.
    pub panicked: Vec<SlotId>,
}

impl JoinSummary {
    fn record(&mut self, slot: SlotId, outcome: thread::Result<()>) {
        self.joined += 1;
        if outcome.is_err() {
            self.panicked.push(slot);
        }
    }
}
