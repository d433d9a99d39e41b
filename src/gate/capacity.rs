//! Bounded-buffer slot accounting
//!
//! A free/used semaphore pair models the buffer's capacity:
//!
//! - producers take a free slot before inserting and post a used slot after
//! - eviction takes a used slot and posts a free slot
//! - consumers pace on the used count: the wait/post pair on a used slot is
//!   a single wait for at least one record, which leaves the count alone
//!
//! With no writer inside the exclusive region, `free + used == capacity` and
//! `used` equals the buffer's record count.

use std::time::Duration;

use serde::Serialize;

use super::semaphore::Semaphore;

/// Point-in-time view of the slot counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapacitySnapshot {
    pub capacity: usize,
    pub free_slots: usize,
    pub used_slots: usize,
}

/// Free/used slot counters for a buffer of fixed capacity.
#[derive(Debug)]
pub struct CapacityGate {
    capacity: usize,
    free: Semaphore,
    used: Semaphore,
}

impl CapacityGate {
    /// Creates a gate for an empty buffer.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            free: Semaphore::new(capacity),
            used: Semaphore::new(0),
        }
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Blocks until a free slot exists, then claims it.
    pub fn acquire_free_slot(&self) {
        self.free.acquire();
    }

    /// Claims a free slot, waiting at most `timeout`. Returns whether a slot
    /// was claimed.
    pub fn acquire_free_slot_timeout(&self, timeout: Duration) -> bool {
        self.free.acquire_timeout(timeout)
    }

    /// Returns a free slot (after an eviction, or an insert that did not
    /// happen) and wakes a waiting producer.
    pub fn release_free_slot(&self) {
        self.free.release();
    }

    /// Claims a used slot without blocking. Eviction calls this; it succeeds
    /// whenever the buffer is non-empty.
    pub fn take_used_slot(&self) -> bool {
        self.used.try_acquire()
    }

    /// Posts a used slot after a successful insert.
    pub fn release_used_slot(&self) {
        self.used.release();
    }

    /// Consumer pacing: waits until at least one record exists.
    ///
    /// This is the consumer's wait/post pair on the used slot collapsed into
    /// a single wait, so the counters are never out of step with the buffer
    /// while a read is in progress. `None` waits indefinitely. Returns
    /// whether a record was observed.
    pub fn wait_for_used(&self, timeout: Option<Duration>) -> bool {
        self.used.wait_available(timeout)
    }

    /// Rebuilds the counters for a buffer now holding `used` records.
    pub fn reset(&self, used: usize) {
        let used = used.min(self.capacity);
        self.used.set(used);
        self.free.set(self.capacity - used);
    }

    pub fn snapshot(&self) -> CapacitySnapshot {
        CapacitySnapshot {
            capacity: self.capacity,
            free_slots: self.free.available(),
            used_slots: self.used.available(),
        }
    }
}

/// Soft-threshold eviction policy.
///
/// When the buffer already holds `soft_threshold` records, a producer evicts
/// the oldest record before waiting for a free slot, instead of parking on a
/// full buffer. The check is a heuristic; the eviction re-checks the count
/// under exclusive access and does nothing if it has fallen below the
/// threshold in the meantime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EvictionPolicy {
    soft_threshold: Option<usize>,
}

impl EvictionPolicy {
    /// Policy with the given threshold; `None` disables proactive eviction.
    pub fn new(soft_threshold: Option<usize>) -> Self {
        Self { soft_threshold }
    }

    pub fn soft_threshold(&self) -> Option<usize> {
        self.soft_threshold
    }

    /// Whether a buffer holding `count` records has reached the threshold.
    pub fn should_evict(&self, count: usize) -> bool {
        match self.soft_threshold {
            Some(threshold) => count >= threshold,
            None => false,
        }
    }
}
