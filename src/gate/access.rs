//! Multi-reader / single-writer access gate
//!
//! Built from binary semaphores rather than a library RW lock:
//!
//! - `serialization`: producer-serialization lock, one writer at a time
//! - `exclusion`: shared exclusion lock, held by one writer or by the group
//!   of active readers
//! - `reader_count`: counting lock; the first reader in acquires `exclusion`
//!   on behalf of all readers, the last reader out releases it
//!
//! Acquisition order is serialization -> (capacity wait) -> exclusion ->
//! buffer state. [`ProducerPermit::enter_writer`] is the only way the producer
//! path can reach the exclusion lock, so the order cannot be inverted by a
//! caller.
//!
//! Readers have priority: while readers keep arriving the exclusion lock
//! stays with the reader group and a writer waits. This is accepted.
//!
//! Every entry returns a guard that releases on drop, so an early return or
//! an unwinding panic never leaves the gate held.

use std::sync::Mutex;

use serde::Serialize;

use super::semaphore::{lock_unpoisoned, Semaphore};

/// Diagnostic state. Guarded by its own lock, which is never held while
/// blocking on another primitive.
#[derive(Debug, Default)]
struct GateBook {
    active_readers: usize,
    writer_active: bool,
    overlap_violations: u64,
    writer_entries: u64,
    reader_entries: u64,
}

/// Point-in-time view of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessSnapshot {
    /// Readers currently inside the shared region
    pub active_readers: usize,
    /// Whether a writer is inside the exclusive region
    pub writer_active: bool,
    /// Whether the producer-serialization lock is held
    pub producer_active: bool,
    /// Times a reader and a writer were observed inside together (always 0)
    pub overlap_violations: u64,
    pub writer_entries: u64,
    pub reader_entries: u64,
}

/// Readers-writer gate.
#[derive(Debug)]
pub struct AccessGate {
    serialization: Semaphore,
    exclusion: Semaphore,
    reader_count: Mutex<usize>,
    book: Mutex<GateBook>,
}

impl Default for AccessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessGate {
    /// Creates an idle gate.
    pub fn new() -> Self {
        Self {
            serialization: Semaphore::new(1),
            exclusion: Semaphore::new(1),
            reader_count: Mutex::new(0),
            book: Mutex::new(GateBook::default()),
        }
    }

    /// Takes the producer-serialization lock, blocking behind other writers.
    pub fn serialize_producer(&self) -> ProducerPermit<'_> {
        self.serialization.acquire();
        ProducerPermit { gate: self }
    }

    /// Takes the producer-serialization lock only if no writer holds it.
    pub fn try_serialize_producer(&self) -> Option<ProducerPermit<'_>> {
        if self.serialization.try_acquire() {
            Some(ProducerPermit { gate: self })
        } else {
            None
        }
    }

    /// Full writer entry: serialization, then exclusion.
    pub fn enter_writer(&self) -> WriterSession<'_> {
        let permit = self.serialize_producer();
        self.exclusion.acquire();
        self.mark_writer_entered();
        WriterSession {
            _guard: WriteGuard { gate: self },
            _permit: permit,
        }
    }

    /// Administrative exclusive entry that skips the serialization lock.
    ///
    /// Used by manual eviction, which has to make progress while a producer
    /// holds the serialization lock and waits on the capacity gate for the
    /// slot that eviction frees. Writers stay mutually exclusive through the
    /// exclusion lock.
    pub fn enter_exclusive(&self) -> WriteGuard<'_> {
        self.exclusion.acquire();
        self.mark_writer_entered();
        WriteGuard { gate: self }
    }

    /// Shared reader entry.
    pub fn enter_reader(&self) -> ReadGuard<'_> {
        let mut readers = lock_unpoisoned(&self.reader_count);
        *readers += 1;
        if *readers == 1 {
            // Later readers queue on `reader_count` until the group holds
            // the exclusion lock.
            self.exclusion.acquire();
        }
        let mut book = lock_unpoisoned(&self.book);
        book.active_readers += 1;
        book.reader_entries += 1;
        if book.writer_active {
            book.overlap_violations += 1;
        }
        drop(book);
        drop(readers);
        ReadGuard { gate: self }
    }

    /// Whether a writer holds the serialization lock or is inside.
    pub fn writer_active(&self) -> bool {
        self.serialization.available() == 0 || lock_unpoisoned(&self.book).writer_active
    }

    pub fn snapshot(&self) -> AccessSnapshot {
        let book = lock_unpoisoned(&self.book);
        AccessSnapshot {
            active_readers: book.active_readers,
            writer_active: book.writer_active,
            producer_active: self.serialization.available() == 0,
            overlap_violations: book.overlap_violations,
            writer_entries: book.writer_entries,
            reader_entries: book.reader_entries,
        }
    }

    fn mark_writer_entered(&self) {
        let mut book = lock_unpoisoned(&self.book);
        book.writer_active = true;
        book.writer_entries += 1;
        if book.active_readers > 0 {
            book.overlap_violations += 1;
        }
    }

    fn exit_writer(&self) {
        lock_unpoisoned(&self.book).writer_active = false;
        self.exclusion.release();
    }

    fn exit_reader(&self) {
        let mut readers = lock_unpoisoned(&self.reader_count);
        lock_unpoisoned(&self.book).active_readers -= 1;
        *readers -= 1;
        if *readers == 0 {
            self.exclusion.release();
        }
    }
}

/// Proof that the caller holds the producer-serialization lock.
#[derive(Debug)]
pub struct ProducerPermit<'a> {
    gate: &'a AccessGate,
}

impl ProducerPermit<'_> {
    /// Acquires the exclusion lock while holding this permit.
    ///
    /// The returned guard borrows the permit, so exclusion is always
    /// released before serialization.
    pub fn enter_writer(&self) -> WriteGuard<'_> {
        self.gate.exclusion.acquire();
        self.gate.mark_writer_entered();
        WriteGuard { gate: self.gate }
    }
}

impl Drop for ProducerPermit<'_> {
    fn drop(&mut self) {
        self.gate.serialization.release();
    }
}

/// Exclusive access; released on drop.
#[derive(Debug)]
pub struct WriteGuard<'a> {
    gate: &'a AccessGate,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.gate.exit_writer();
    }
}

/// Serialization plus exclusion, released in reverse order on drop.
#[derive(Debug)]
pub struct WriterSession<'a> {
    // Field order is drop order: exclusion first, then serialization.
    _guard: WriteGuard<'a>,
    _permit: ProducerPermit<'a>,
}

/// Shared access; released on drop.
#[derive(Debug)]
pub struct ReadGuard<'a> {
    gate: &'a AccessGate,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.gate.exit_reader();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_idle_gate() {
        let gate = AccessGate::new();
        let snap = gate.snapshot();
        assert_eq!(snap.active_readers, 0);
        assert!(!snap.writer_active);
        assert!(!snap.producer_active);
        assert!(!gate.writer_active());
    }

    #[test]
    fn test_readers_share() {
        let gate = AccessGate::new();
        let r1 = gate.enter_reader();
        let r2 = gate.enter_reader();
        assert_eq!(gate.snapshot().active_readers, 2);
        drop(r1);
        assert_eq!(gate.snapshot().active_readers, 1);
        drop(r2);
        assert_eq!(gate.snapshot().active_readers, 0);
        // Exclusion was returned by the last reader.
        let _w = gate.enter_exclusive();
        assert!(gate.snapshot().writer_active);
    }

    #[test]
    fn test_writer_session_releases_both_locks() {
        let gate = AccessGate::new();
        {
            let _session = gate.enter_writer();
            let snap = gate.snapshot();
            assert!(snap.writer_active);
            assert!(snap.producer_active);
            assert!(gate.try_serialize_producer().is_none());
        }
        let snap = gate.snapshot();
        assert!(!snap.writer_active);
        assert!(!snap.producer_active);
        assert!(gate.try_serialize_producer().is_some());
    }

    #[test]
    fn test_permit_then_writer() {
        let gate = AccessGate::new();
        let permit = gate.serialize_producer();
        assert!(gate.writer_active());
        {
            let _guard = permit.enter_writer();
            assert!(gate.snapshot().writer_active);
        }
        assert!(!gate.snapshot().writer_active);
        drop(permit);
        assert!(!gate.writer_active());
    }

    #[test]
    fn test_writer_waits_for_readers() {
        let gate = Arc::new(AccessGate::new());
        let reader = gate.enter_reader();

        let entered = Arc::new(AtomicUsize::new(0));
        let writer = {
            let gate = Arc::clone(&gate);
            let entered = Arc::clone(&entered);
            thread::spawn(move || {
                let _session = gate.enter_writer();
                entered.store(1, Ordering::SeqCst);
            })
        };
        thread::sleep(Duration::from_millis(40));
        assert_eq!(entered.load(Ordering::SeqCst), 0);
        drop(reader);
        writer.join().unwrap();
        assert_eq!(entered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_manual_entry_while_producer_parked() {
        let gate = Arc::new(AccessGate::new());
        let permit = gate.serialize_producer();
        let admin = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                let _guard = gate.enter_exclusive();
                true
            })
        };
        assert!(admin.join().unwrap());
        drop(permit);
    }

    #[test]
    fn test_no_reader_writer_overlap_under_load() {
        let gate = Arc::new(AccessGate::new());
        let inside_writers = Arc::new(AtomicUsize::new(0));
        let inside_readers = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();

        for _ in 0..3 {
            let gate = Arc::clone(&gate);
            let inside_writers = Arc::clone(&inside_writers);
            let inside_readers = Arc::clone(&inside_readers);
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    let _session = gate.enter_writer();
                    let writers = inside_writers.fetch_add(1, Ordering::SeqCst) + 1;
                    assert_eq!(writers, 1);
                    assert_eq!(inside_readers.load(Ordering::SeqCst), 0);
                    thread::yield_now();
                    inside_writers.fetch_sub(1, Ordering::SeqCst);
                }
            }));
        }
        for _ in 0..5 {
            let gate = Arc::clone(&gate);
            let inside_writers = Arc::clone(&inside_writers);
            let inside_readers = Arc::clone(&inside_readers);
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    let _guard = gate.enter_reader();
                    inside_readers.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(inside_writers.load(Ordering::SeqCst), 0);
                    thread::yield_now();
                    inside_readers.fetch_sub(1, Ordering::SeqCst);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let snap = gate.snapshot();
        assert_eq!(snap.overlap_violations, 0);
        assert_eq!(snap.writer_entries, 150);
        assert_eq!(snap.reader_entries, 250);
        assert_eq!(snap.active_readers, 0);
        assert!(!snap.writer_active);
    }
}
