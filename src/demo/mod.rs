//! Timed producer/consumer demonstration
//!
//! Producers publish canned headlines into a shared store while readers
//! list and query it. The run ends when every producer has published its
//! quota, when the timeout expires, or when the caller sets the
//! [`StopFlag`]. Cancellation is cooperative: workers check the flag
//! between operations, never inside one, so every lock is released by the
//! time a worker exits.

mod headlines;

pub use headlines::{split_headline, HEADLINES};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::observability::{log_event_with_fields, Event};
use crate::store::{NewsStore, StoreError, StoreResult};

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sleeps for `duration` in short steps. Returns false if the flag was
    /// set meanwhile.
    pub fn sleep(&self, duration: Duration) -> bool {
        const STEP: Duration = Duration::from_millis(20);
        let deadline = Instant::now() + duration;
        loop {
            if self.is_stopped() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(STEP.min(deadline - now));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoConfig {
    pub producers: usize,
    pub readers: usize,
    pub items_per_producer: usize,
    pub reads_per_reader: usize,
    /// Pause after each publish
    pub write_delay: Duration,
    /// Pause after each read
    pub read_delay: Duration,
    /// Longest a producer waits for a free slot before re-checking the flag
    pub append_wait: Duration,
    pub timeout: Duration,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            producers: 2,
            readers: 5,
            items_per_producer: 11,
            reads_per_reader: 10,
            write_delay: Duration::from_secs(2),
            read_delay: Duration::from_secs(1),
            append_wait: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
        }
    }
}

/// What a demo run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DemoReport {
    pub published: usize,
    pub reads: usize,
    pub records_at_end: usize,
    /// True if the run ended on timeout or an external stop
    pub stopped_early: bool,
    pub elapsed_ms: u64,
}

/// Runs the demo to completion, timeout or stop.
///
/// # Errors
///
/// The first store error a worker hit (other than backpressure, which is
/// retried), or a failure of the final journal sync.
pub fn run_demo(store: Arc<NewsStore>, config: &DemoConfig, stop: StopFlag) -> StoreResult<DemoReport> {
    let started = Instant::now();
    log_event_with_fields(
        Event::DemoStart,
        &[
            ("producers", &config.producers.to_string()),
            ("readers", &config.readers.to_string()),
            ("timeout_ms", &config.timeout.as_millis().to_string()),
        ],
    );

    let readers: Vec<JoinHandle<StoreResult<usize>>> = (0..config.readers)
        .map(|index| {
            let store = Arc::clone(&store);
            let stop = stop.clone();
            let config = config.clone();
            thread::spawn(move || read_loop(&store, &config, &stop, index))
        })
        .collect();

    let producers: Vec<JoinHandle<StoreResult<usize>>> = (0..config.producers)
        .map(|index| {
            let store = Arc::clone(&store);
            let stop = stop.clone();
            let config = config.clone();
            thread::spawn(move || publish_loop(&store, &config, &stop, index))
        })
        .collect();

    let mut stopped_early = false;
    loop {
        if stop.is_stopped() {
            stopped_early = true;
            break;
        }
        if producers.iter().all(|handle| handle.is_finished()) {
            break;
        }
        if started.elapsed() >= config.timeout {
            stopped_early = true;
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }
    log_event_with_fields(
        Event::DemoStopRequested,
        &[("early", if stopped_early { "true" } else { "false" })],
    );
    stop.stop();

    let mut first_error: Option<StoreError> = None;
    let mut published = 0;
    for result in join_all(producers) {
        match result {
            Ok(count) => published += count,
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    let mut reads = 0;
    for result in join_all(readers) {
        match result {
            Ok(count) => reads += count,
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }

    store.sync()?;
    let report = DemoReport {
        published,
        reads,
        records_at_end: store.len(),
        stopped_early,
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    };
    log_event_with_fields(
        Event::DemoComplete,
        &[
            ("published", &report.published.to_string()),
            ("reads", &report.reads.to_string()),
            ("records", &report.records_at_end.to_string()),
        ],
    );
    Ok(report)
}

fn join_all(handles: Vec<JoinHandle<StoreResult<usize>>>) -> Vec<StoreResult<usize>> {
    handles
        .into_iter()
        .map(|handle| match handle.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        })
        .collect()
}

/// Publishes this producer's share of the headlines. Returns how many were
/// stored.
fn publish_loop(
    store: &NewsStore,
    config: &DemoConfig,
    stop: &StopFlag,
    index: usize,
) -> StoreResult<usize> {
    let catalog = store.categories();
    let mut published = 0;
    let mut cursor = index * config.items_per_producer;

    while published < config.items_per_producer && !stop.is_stopped() {
        let (headline, body) = HEADLINES[cursor % HEADLINES.len()];
        cursor += 1;

        let (prefix, title) = split_headline(headline);
        let category = match prefix.and_then(|p| catalog.lookup(p)) {
            Some(category) => category,
            None => catalog.get(published % catalog.len()).unwrap_or_default(),
        };

        match store.append_within(category, title, body, config.append_wait) {
            Ok(_) => published += 1,
            // Full buffer: go round and re-check the flag.
            Err(StoreError::Backpressure { .. }) => continue,
            Err(e) => return Err(e),
        }

        if !stop.sleep(config.write_delay) {
            break;
        }
    }
    Ok(published)
}

/// Alternates full listings with per-category queries. Returns the number
/// of reads served.
fn read_loop(
    store: &NewsStore,
    config: &DemoConfig,
    stop: &StopFlag,
    index: usize,
) -> StoreResult<usize> {
    let catalog = store.categories();
    let mut reads = 0;

    while reads < config.reads_per_reader && !stop.is_stopped() {
        if (index + reads) % 2 == 0 {
            store.list_all();
        } else {
            let category = catalog.get((index + reads) % catalog.len()).unwrap_or_default();
            store.query_by_category(category);
        }
        reads += 1;

        if !stop.sleep(config.read_delay) {
            break;
        }
    }
    Ok(reads)
}
