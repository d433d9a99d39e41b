//! The news store: ring buffer, gates and journal behind one API
//!
//! Lock order, outermost first:
//!
//! 1. producer serialization (appends, edits, reload)
//! 2. free-slot wait on the capacity gate
//! 3. shared exclusion (writers, or the reader group)
//! 4. the buffer state mutex
//!
//! Manual eviction and `sync` enter at level 3. Reload only ever
//! try-acquires level 1. The capacity gate's own mutexes are leaves.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;

use super::config::StoreConfig;
use super::errors::{StoreError, StoreResult};
use super::ids::IdAllocator;
use crate::gate::{
    lock_unpoisoned, AccessGate, AccessSnapshot, CapacityGate, CapacitySnapshot, EvictionPolicy,
    ProducerPermit,
};
use crate::journal::{discard_temp_artifacts, load_all, JournalError, JournalWriter, LoadReport};
use crate::observability::{
    log_event_with_fields, Event, MetricsSnapshot, ObservationScope, StoreMetrics,
};
use crate::record::{validate_text, CategoryCatalog, NewsRecord, RecordEdit};
use crate::ring::RingBuffer;

/// Buffer and journal, always changed together.
struct StoreState {
    ring: RingBuffer,
    journal: JournalWriter,
    /// The journal lags the buffer after a failed write; the next mutation
    /// or `sync` rewrites it in full.
    dirty: bool,
}

#[derive(Debug, Clone, Copy)]
enum EvictionKind {
    Soft,
    Manual,
}

impl EvictionKind {
    fn as_str(&self) -> &'static str {
        match self {
            EvictionKind::Soft => "soft_threshold",
            EvictionKind::Manual => "manual",
        }
    }
}

/// Point-in-time view of the whole store.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub records: usize,
    pub capacity: usize,
    pub soft_threshold: Option<usize>,
    pub next_id: u64,
    /// Physical index of the oldest record
    pub ring_start: usize,
    /// Physical index the next insert uses
    pub ring_end: usize,
    pub journal_dirty: bool,
    pub journal_path: String,
    pub slots: CapacitySnapshot,
    pub access: AccessSnapshot,
    pub metrics: MetricsSnapshot,
}

/// A bounded news store shared by producer and consumer threads.
///
/// Share it behind an `Arc`; every operation takes `&self`.
pub struct NewsStore {
    config: StoreConfig,
    catalog: CategoryCatalog,
    policy: EvictionPolicy,
    access: AccessGate,
    slots: CapacityGate,
    state: Mutex<StoreState>,
    ids: IdAllocator,
    metrics: StoreMetrics,
}

impl NewsStore {
    /// Opens (or creates) the store's journal and loads it into the buffer.
    ///
    /// A temp file left by an interrupted rewrite is discarded first. If the
    /// journal holds more records than the buffer, the newest `capacity` are
    /// kept and the journal is rewritten to match.
    ///
    /// # Errors
    ///
    /// `Config` for an invalid configuration; a fatal `Journal` error if the
    /// journal cannot be opened or read.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let catalog = config.catalog()?;
        let journal_path = config.journal_path.display().to_string();
        let scope = ObservationScope::with_fields("STORE_OPEN", &[("journal_path", &journal_path)]);

        let (state, report_max, skipped) = match Self::load_state(&config) {
            Ok(loaded) => loaded,
            Err(e) => {
                log_event_with_fields(
                    Event::JournalOpenFailed,
                    &[("error", &e.to_string()), ("journal_path", &journal_path)],
                );
                scope.fail(&e.to_string());
                return Err(e.into());
            }
        };

        let slots = CapacityGate::new(config.capacity);
        slots.reset(state.ring.len());
        let metrics = StoreMetrics::new();
        metrics.add_lines_skipped(skipped as u64);

        let store = Self {
            policy: config.eviction_policy(),
            catalog,
            access: AccessGate::new(),
            slots,
            state: Mutex::new(state),
            ids: IdAllocator::after(report_max),
            metrics,
            config,
        };

        {
            let mut guard = store.lock_state();
            let state = &mut *guard;
            if state.dirty {
                // Trimmed on load. A failure here leaves the journal dirty
                // for the next mutation; the store is still usable.
                let _ = store.rewrite_journal(state, None, "trim");
            }
        }

        scope.complete_with_fields(&[
            ("records", &store.len().to_string()),
            ("skipped", &skipped.to_string()),
        ]);
        Ok(store)
    }

    /// Opens the journal and fills a ring from it. Returns the state, the
    /// largest id seen, and the number of skipped lines.
    fn load_state(config: &StoreConfig) -> Result<(StoreState, Option<u64>, usize), JournalError> {
        let path = config.journal_path.as_path();
        discard_temp_artifacts(path)?;
        let journal = JournalWriter::open(path)?;
        let report = load_all(path)?;
        let max_id = report.max_id();
        let skipped = report.skipped_count();
        let mut ring = RingBuffer::new(config.capacity);
        let dropped = fill_ring(&mut ring, report.records, path);
        Ok((
            StoreState {
                ring,
                journal,
                dirty: dropped > 0,
            },
            max_id,
            skipped,
        ))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn categories(&self) -> &CategoryCatalog {
        &self.catalog
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Records currently held.
    pub fn len(&self) -> usize {
        self.lock_state().ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn journal_path(&self) -> &Path {
        &self.config.journal_path
    }

    /// Stores a new record and returns its id.
    ///
    /// Blocks while the buffer is full. At or above the soft threshold the
    /// oldest record is evicted first, so a producer only blocks when the
    /// threshold is disabled (or equals the capacity) and nothing else frees
    /// a slot.
    pub fn append(&self, category: &str, title: &str, body: &str) -> StoreResult<u64> {
        self.append_inner(category, title, body, None)
    }

    /// Like [`append`](Self::append), but gives up with `Backpressure` if no
    /// slot frees up within `wait`. Nothing changes on timeout.
    pub fn append_within(
        &self,
        category: &str,
        title: &str,
        body: &str,
        wait: Duration,
    ) -> StoreResult<u64> {
        self.append_inner(category, title, body, Some(wait))
    }

    fn append_inner(
        &self,
        category: &str,
        title: &str,
        body: &str,
        wait: Option<Duration>,
    ) -> StoreResult<u64> {
        let category = self.known_category(category)?;
        validate_text("title", title, self.config.max_text_len)?;
        validate_text("body", body, self.config.max_text_len)?;

        let permit = self.access.serialize_producer();

        if self.policy.should_evict(self.len()) {
            self.soft_evict(&permit);
        }

        match wait {
            None => self.slots.acquire_free_slot(),
            Some(wait) => {
                if !self.slots.acquire_free_slot_timeout(wait) {
                    let waited_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX);
                    self.metrics.increment_backpressure_timeouts();
                    log_event_with_fields(
                        Event::ProducerBackpressure,
                        &[("waited_ms", &waited_ms.to_string())],
                    );
                    return Err(StoreError::Backpressure { waited_ms });
                }
            }
        }

        let _guard = permit.enter_writer();
        let mut guard = self.lock_state();
        let state = &mut *guard;

        let record = NewsRecord::create(self.ids.next_id(), category, title, body);
        if let Err(e) = self.persist_insert(state, &record) {
            self.slots.release_free_slot();
            self.metrics.increment_append_failures();
            log_event_with_fields(
                Event::JournalAppendFailed,
                &[("error", &e.to_string()), ("id", &record.id.to_string())],
            );
            return Err(e.into());
        }

        let id = record.id;
        if state.ring.insert(record).is_err() {
            // The slot count and the ring disagree. Nothing was overwritten;
            // the journal line written above goes at the next rewrite.
            state.dirty = true;
            self.slots.release_free_slot();
            return Err(StoreError::Backpressure { waited_ms: 0 });
        }
        self.slots.release_used_slot();
        self.metrics.increment_appends();
        log_event_with_fields(
            Event::RecordAppended,
            &[("category", category), ("id", &id.to_string())],
        );
        Ok(id)
    }

    /// Writes a new record to the journal before it enters the buffer.
    fn persist_insert(&self, state: &mut StoreState, record: &NewsRecord) -> Result<(), JournalError> {
        if state.dirty {
            return self.rewrite_journal(state, Some(record), "append");
        }
        match state.journal.append_one(record) {
            Ok(bytes) => {
                self.metrics.add_journal_bytes(bytes);
                Ok(())
            }
            Err(e) => {
                // A partial line may have reached the file.
                state.dirty = true;
                Err(e)
            }
        }
    }

    /// Proactive eviction by a producer holding the serialization lock.
    ///
    /// The count is re-checked under exclusive access. A failed journal
    /// rewrite is not fatal to the append: the journal stays dirty and the
    /// append's own write rewrites it.
    fn soft_evict(&self, permit: &ProducerPermit<'_>) {
        let _guard = permit.enter_writer();
        let mut guard = self.lock_state();
        let state = &mut *guard;
        if !self.policy.should_evict(state.ring.len()) {
            return;
        }
        let _ = self.evict_locked(state, EvictionKind::Soft);
    }

    /// Removes the oldest record, if any.
    ///
    /// Runs without the producer-serialization lock, so it can free the
    /// slot a blocked producer is waiting for.
    pub fn evict_oldest_manual(&self) -> StoreResult<Option<NewsRecord>> {
        let _guard = self.access.enter_exclusive();
        let mut guard = self.lock_state();
        self.evict_locked(&mut guard, EvictionKind::Manual)
            .map_err(StoreError::from)
    }

    /// Evicts under exclusive access and rewrites the journal.
    ///
    /// On a rewrite failure the record stays evicted, the journal is left
    /// dirty, and the error is returned.
    fn evict_locked(
        &self,
        state: &mut StoreState,
        kind: EvictionKind,
    ) -> Result<Option<NewsRecord>, JournalError> {
        let Some(record) = state.ring.evict_oldest() else {
            return Ok(None);
        };
        let took = self.slots.take_used_slot();
        debug_assert!(took, "used slots out of step with the ring");
        self.slots.release_free_slot();

        match kind {
            EvictionKind::Soft => self.metrics.increment_soft_evictions(),
            EvictionKind::Manual => self.metrics.increment_manual_evictions(),
        }
        log_event_with_fields(
            Event::RecordEvicted,
            &[
                ("id", &record.id.to_string()),
                ("reason", kind.as_str()),
                ("remaining", &state.ring.len().to_string()),
            ],
        );

        self.rewrite_journal(state, None, kind.as_str())?;
        Ok(Some(record))
    }

    /// Replaces the named fields of a record, keeping its id, timestamp and
    /// position, and rewrites the journal.
    ///
    /// # Errors
    ///
    /// `NotFound` (nothing changes) if no record has `id`.
    pub fn edit(&self, id: u64, edit: RecordEdit) -> StoreResult<NewsRecord> {
        if let Some(ref category) = edit.category {
            self.known_category(category)?;
        }
        if let Some(ref title) = edit.title {
            validate_text("title", title, self.config.max_text_len)?;
        }
        if let Some(ref body) = edit.body {
            validate_text("body", body, self.config.max_text_len)?;
        }

        let _session = self.access.enter_writer();
        let mut guard = self.lock_state();
        let state = &mut *guard;

        let position = state.ring.find_by_id(id).ok_or(StoreError::NotFound(id))?;
        let current = state.ring.get(position).ok_or(StoreError::NotFound(id))?;
        if edit.is_empty() {
            return Ok(current.clone());
        }

        let revised = current.revised(&edit);
        state.ring.replace_at(position, revised.clone());
        self.metrics.increment_edits();
        log_event_with_fields(Event::RecordEdited, &[("id", &id.to_string())]);

        self.rewrite_journal(state, None, "edit")?;
        Ok(revised)
    }

    /// Records in `category`, oldest first. An unknown category yields an
    /// empty result.
    pub fn query_by_category(&self, category: &str) -> Vec<NewsRecord> {
        if !self.catalog.contains(category) {
            return Vec::new();
        }
        self.read("category", |ring| {
            ring.iter()
                .filter(|record| record.category == category)
                .cloned()
                .collect()
        })
    }

    /// Every record, oldest first.
    pub fn list_all(&self) -> Vec<NewsRecord> {
        self.read("all", RingBuffer::snapshot)
    }

    /// Consumer path: pace on the used count, then read under shared
    /// access.
    fn read<T>(&self, kind: &str, f: impl FnOnce(&RingBuffer) -> T) -> T {
        // After a pacing timeout the read goes ahead and sees an empty
        // buffer.
        let _ = self.slots.wait_for_used(self.config.read_pacing());

        let _reader = self.access.enter_reader();
        let state = self.lock_state();
        let result = f(&state.ring);
        drop(state);

        self.metrics.increment_queries();
        log_event_with_fields(Event::QueryServed, &[("kind", kind)]);
        result
    }

    /// Rebuilds the buffer from the journal.
    ///
    /// A dirty journal is rewritten first so no acknowledged change is lost.
    ///
    /// # Errors
    ///
    /// `WriterActive` while a producer holds the serialization lock or a
    /// writer is inside; the buffer is untouched.
    pub fn reload(&self) -> StoreResult<LoadReport> {
        let permit = match self.try_reload_permit() {
            Some(permit) => permit,
            None => {
                self.metrics.increment_reloads_refused();
                log_event_with_fields(Event::ReloadRefused, &[("reason", "writer active")]);
                return Err(StoreError::WriterActive);
            }
        };
        let _guard = permit.enter_writer();
        let mut guard = self.lock_state();
        let state = &mut *guard;

        if state.dirty {
            self.rewrite_journal(state, None, "reload")?;
        }

        let report = load_all(state.journal.path())?;
        self.metrics.add_lines_skipped(report.skipped_count() as u64);
        let dropped = fill_ring(
            &mut state.ring,
            report.records.clone(),
            &self.config.journal_path,
        );
        self.slots.reset(state.ring.len());
        state.journal.reopen()?;
        self.ids.advance_past(report.max_id());
        if dropped > 0 {
            self.rewrite_journal(state, None, "trim")?;
        }

        self.metrics.increment_reloads();
        log_event_with_fields(
            Event::ReloadComplete,
            &[
                ("records", &state.ring.len().to_string()),
                ("skipped", &report.skipped_count().to_string()),
            ],
        );
        Ok(report)
    }

    fn try_reload_permit(&self) -> Option<ProducerPermit<'_>> {
        if self.access.writer_active() {
            return None;
        }
        self.access.try_serialize_producer()
    }

    /// Rewrites the journal from the buffer if an earlier write failed.
    pub fn sync(&self) -> StoreResult<()> {
        let _guard = self.access.enter_exclusive();
        let mut guard = self.lock_state();
        let state = &mut *guard;
        if state.dirty {
            self.rewrite_journal(state, None, "sync")?;
        }
        Ok(())
    }

    /// Flushes a dirty journal and closes the store.
    pub fn close(self) -> StoreResult<()> {
        self.sync()?;
        log_event_with_fields(
            Event::StoreClosed,
            &[("records", &self.len().to_string())],
        );
        Ok(())
    }

    pub fn stats(&self) -> StoreStats {
        let (records, ring_start, ring_end, dirty) = {
            let state = self.lock_state();
            (state.ring.len(), state.ring.start(), state.ring.end(), state.dirty)
        };
        StoreStats {
            records,
            capacity: self.config.capacity,
            soft_threshold: self.policy.soft_threshold(),
            next_id: self.ids.peek(),
            ring_start,
            ring_end,
            journal_dirty: dirty,
            journal_path: self.config.journal_path.display().to_string(),
            slots: self.slots.snapshot(),
            access: self.access.snapshot(),
            metrics: self.metrics.snapshot(),
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Rewrites the journal as the buffer plus an optional record about to
    /// be inserted.
    fn rewrite_journal(
        &self,
        state: &mut StoreState,
        pending: Option<&NewsRecord>,
        reason: &str,
    ) -> Result<(), JournalError> {
        let records = (state.ring.len() + usize::from(pending.is_some())).to_string();
        let scope = ObservationScope::with_fields(
            "JOURNAL_REWRITE",
            &[("reason", reason), ("records", &records)],
        );
        match state
            .journal
            .compact_rewrite(state.ring.iter().chain(pending))
        {
            Ok(bytes) => {
                state.dirty = false;
                self.metrics.increment_compactions();
                self.metrics.add_journal_bytes(bytes);
                scope.complete_with_fields(&[("bytes", &bytes.to_string())]);
                Ok(())
            }
            Err(e) => {
                state.dirty = true;
                self.metrics.increment_compaction_failures();
                scope.fail(&e.to_string());
                Err(e)
            }
        }
    }

    fn known_category<'a>(&'a self, name: &str) -> StoreResult<&'a str> {
        self.catalog
            .lookup(name)
            .ok_or_else(|| StoreError::UnknownCategory(name.to_string()))
    }

    fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        lock_unpoisoned(&self.state)
    }
}

/// Empties the ring and refills it with the newest records that fit.
/// Returns how many older records were dropped.
fn fill_ring(ring: &mut RingBuffer, records: Vec<NewsRecord>, path: &Path) -> usize {
    ring.clear();
    let capacity = ring.capacity();
    let dropped = records.len().saturating_sub(capacity);
    if dropped > 0 {
        log_event_with_fields(
            Event::JournalTrimmed,
            &[
                ("dropped", &dropped.to_string()),
                ("kept", &capacity.to_string()),
                ("path", &path.display().to_string()),
            ],
        );
    }
    for record in records.into_iter().skip(dropped) {
        // At most `capacity` records remain.
        let _ = ring.insert(record);
    }
    dropped
}
