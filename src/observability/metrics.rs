//! Store counters
//!
//! - Counters only, monotonic, reset on process start
//! - Thread-safe, lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for one open store.
///
/// Relaxed ordering throughout: values are exact once the threads that
/// bumped them have been joined, which is all the tests and the `stats`
/// command need.
#[derive(Debug, Default)]
pub struct StoreMetrics {
    appends: AtomicU64,
    append_failures: AtomicU64,
    edits: AtomicU64,
    soft_evictions: AtomicU64,
    manual_evictions: AtomicU64,
    compactions: AtomicU64,
    compaction_failures: AtomicU64,
    journal_bytes_written: AtomicU64,
    reloads: AtomicU64,
    reloads_refused: AtomicU64,
    lines_skipped: AtomicU64,
    queries: AtomicU64,
    backpressure_timeouts: AtomicU64,
}

impl StoreMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_appends(&self) {
        self.appends.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_append_failures(&self) {
        self.append_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_edits(&self) {
        self.edits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_soft_evictions(&self) {
        self.soft_evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_manual_evictions(&self) {
        self.manual_evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_compactions(&self) {
        self.compactions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_compaction_failures(&self) {
        self.compaction_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Bytes handed to the journal, appends and rewrites alike.
    pub fn add_journal_bytes(&self, bytes: u64) {
        self.journal_bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn increment_reloads(&self) {
        self.reloads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_reloads_refused(&self) {
        self.reloads_refused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_lines_skipped(&self, lines: u64) {
        self.lines_skipped.fetch_add(lines, Ordering::Relaxed);
    }

    pub fn increment_queries(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_backpressure_timeouts(&self) {
        self.backpressure_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all counters as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            appends: self.appends.load(Ordering::Relaxed),
            append_failures: self.append_failures.load(Ordering::Relaxed),
            edits: self.edits.load(Ordering::Relaxed),
            soft_evictions: self.soft_evictions.load(Ordering::Relaxed),
            manual_evictions: self.manual_evictions.load(Ordering::Relaxed),
            compactions: self.compactions.load(Ordering::Relaxed),
            compaction_failures: self.compaction_failures.load(Ordering::Relaxed),
            journal_bytes_written: self.journal_bytes_written.load(Ordering::Relaxed),
            reloads: self.reloads.load(Ordering::Relaxed),
            reloads_refused: self.reloads_refused.load(Ordering::Relaxed),
            lines_skipped: self.lines_skipped.load(Ordering::Relaxed),
            queries: self.queries.load(Ordering::Relaxed),
            backpressure_timeouts: self.backpressure_timeouts.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub appends: u64,
    pub append_failures: u64,
    pub edits: u64,
    pub soft_evictions: u64,
    pub manual_evictions: u64,
    pub compactions: u64,
    pub compaction_failures: u64,
    pub journal_bytes_written: u64,
    pub reloads: u64,
    pub reloads_refused: u64,
    pub lines_skipped: u64,
    pub queries: u64,
    pub backpressure_timeouts: u64,
}

impl MetricsSnapshot {
    /// Total records removed by either eviction path.
    pub fn evictions(&self) -> u64 {
        self.soft_evictions + self.manual_evictions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metrics_are_zero() {
        let metrics = StoreMetrics::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_counters_accumulate() {
        let metrics = StoreMetrics::new();
        metrics.increment_appends();
        metrics.increment_appends();
        metrics.increment_soft_evictions();
        metrics.increment_manual_evictions();
        metrics.add_lines_skipped(3);
        metrics.add_journal_bytes(120);

        let snap = metrics.snapshot();
        assert_eq!(snap.appends, 2);
        assert_eq!(snap.evictions(), 2);
        assert_eq!(snap.lines_skipped, 3);
        assert_eq!(snap.journal_bytes_written, 120);
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = StoreMetrics::new();
        metrics.increment_queries();
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["queries"], 1);
        assert_eq!(json["compactions"], 0);
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let metrics = Arc::new(StoreMetrics::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..500 {
                        metrics.increment_edits();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.snapshot().edits, 4000);
    }
}
