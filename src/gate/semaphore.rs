//! Counting semaphore built on `Mutex` + `Condvar`
//!
//! Unlike a mutex guard, a permit may be released by a different thread than
//! the one that acquired it. The access gate relies on this: the first reader
//! in takes the exclusion permit and the last reader out returns it.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Locks a mutex whose protected data stays consistent across a panic
/// (plain counters and flags), recovering it if poisoned.
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A counting semaphore.
#[derive(Debug)]
pub struct Semaphore {
    permits: Mutex<usize>,
    changed: Condvar,
}

impl Semaphore {
    /// Creates a semaphore holding `permits` permits.
    pub fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            changed: Condvar::new(),
        }
    }

    /// Blocks until a permit is available, then takes it.
    pub fn acquire(&self) {
        let mut permits = lock_unpoisoned(&self.permits);
        while *permits == 0 {
            permits = self
                .changed
                .wait(permits)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *permits -= 1;
    }

    /// Takes a permit if one is available right now.
    pub fn try_acquire(&self) -> bool {
        let mut permits = lock_unpoisoned(&self.permits);
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    /// Waits up to `timeout` for a permit. Returns whether one was taken.
    pub fn acquire_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut permits = lock_unpoisoned(&self.permits);
        while *permits == 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .changed
                .wait_timeout(permits, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            permits = guard;
        }
        *permits -= 1;
        true
    }

    /// Returns a permit and wakes waiters.
    pub fn release(&self) {
        let mut permits = lock_unpoisoned(&self.permits);
        *permits += 1;
        // Waiters include observers of `wait_available`, which do not take
        // the permit, so every waiter has to re-check.
        self.changed.notify_all();
    }

    /// Waits until at least one permit exists without taking it.
    ///
    /// `None` waits indefinitely. Returns whether a permit was observed.
    pub fn wait_available(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut permits = lock_unpoisoned(&self.permits);
        while *permits == 0 {
            match deadline {
                None => {
                    permits = self
                        .changed
                        .wait(permits)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    let (guard, _) = self
                        .changed
                        .wait_timeout(permits, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner);
                    permits = guard;
                }
            }
        }
        true
    }

    /// Overwrites the permit count and wakes waiters.
    pub fn set(&self, value: usize) {
        let mut permits = lock_unpoisoned(&self.permits);
        *permits = value;
        self.changed.notify_all();
    }

    /// Current permit count.
    pub fn available(&self) -> usize {
        *lock_unpoisoned(&self.permits)
    }
}
