//! End-to-end store scenarios
//!
//! Each test drives a store through its public API and checks the buffer
//! against the journal on disk.

use newsdb::journal::temp_path_for;
use newsdb::record::{NewsRecord, RecordEdit};
use newsdb::store::{NewsStore, StoreConfig, StoreError};
use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn test_config(temp: &TempDir) -> StoreConfig {
    StoreConfig::new(temp.path().join("news.txt"))
        .with_read_pacing(Some(Duration::from_millis(20)))
}

fn journal_lines(store: &NewsStore) -> Vec<String> {
    fs::read_to_string(store.journal_path())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn listed_lines(store: &NewsStore) -> Vec<String> {
    store.list_all().iter().map(NewsRecord::to_line).collect()
}

fn titles(records: &[NewsRecord]) -> Vec<&str> {
    records.iter().map(|r| r.title.as_str()).collect()
}

// =============================================================================
// Capacity
// =============================================================================

/// A producer on a full buffer with proactive eviction disabled parks until
/// a manual eviction frees a slot, then completes.
#[test]
fn test_full_buffer_blocks_until_manual_eviction() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(
        NewsStore::open(test_config(&temp).with_capacity(3).with_soft_threshold(None)).unwrap(),
    );
    for title in ["A", "B", "C"] {
        store.append("SPORTS", title, "body").unwrap();
    }

    let producer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            let started = Instant::now();
            let id = store.append("SPORTS", "D", "body").unwrap();
            (id, started.elapsed())
        })
    };

    thread::sleep(Duration::from_millis(100));
    assert_eq!(store.len(), 3);
    assert!(!producer.is_finished());

    let evicted = store.evict_oldest_manual().unwrap().unwrap();
    assert_eq!(evicted.title, "A");

    let (id, waited) = producer.join().unwrap();
    assert_eq!(id, 4);
    assert!(waited >= Duration::from_millis(80));

    assert_eq!(titles(&store.list_all()), vec!["B", "C", "D"]);
    assert_eq!(journal_lines(&store), listed_lines(&store));
}

/// With the default configuration the buffer settles at the soft threshold
/// and the journal keeps matching it.
#[test]
fn test_default_capacity_settles_at_soft_threshold() {
    let temp = TempDir::new().unwrap();
    let store = NewsStore::open(test_config(&temp)).unwrap();
    for i in 0..25 {
        store.append("WEATHER", &format!("forecast {}", i), "rain").unwrap();
    }

    let stats = store.stats();
    assert_eq!(stats.capacity, 20);
    assert_eq!(stats.soft_threshold, Some(18));
    assert_eq!(stats.records, 18);
    assert_eq!(stats.slots.used_slots + stats.slots.free_slots, 20);
    assert_eq!(journal_lines(&store), listed_lines(&store));
}

// =============================================================================
// Queries
// =============================================================================

#[test]
fn test_query_by_custom_category() {
    let temp = TempDir::new().unwrap();
    let store = NewsStore::open(test_config(&temp).with_categories(["X", "Y"])).unwrap();
    store.append("X", "first x", "b").unwrap();
    store.append("Y", "only y", "b").unwrap();
    store.append("X", "second x", "b").unwrap();

    assert_eq!(titles(&store.query_by_category("X")), vec!["first x", "second x"]);
    assert_eq!(titles(&store.query_by_category("Y")), vec!["only y"]);
    assert!(store.query_by_category("Z").is_empty());
    assert!(matches!(
        store.append("Z", "t", "b"),
        Err(StoreError::UnknownCategory(_))
    ));
}

// =============================================================================
// Edits
// =============================================================================

/// An edit survives a reload with its identity intact.
#[test]
fn test_edit_then_reload() {
    let temp = TempDir::new().unwrap();
    let store = NewsStore::open(test_config(&temp)).unwrap();
    let id = store.append("POLITICS", "Vote today", "Polls open at 8").unwrap();
    store.append("SPORTS", "Match report", "2-1").unwrap();
    let before = store.list_all()[0].clone();

    let edited = store
        .edit(
            id,
            RecordEdit {
                title: Some("Vote tomorrow".into()),
                ..RecordEdit::default()
            },
        )
        .unwrap();
    assert_eq!(edited.title, "Vote tomorrow");

    let report = store.reload().unwrap();
    assert_eq!(report.records.len(), 2);
    assert_eq!(report.skipped_count(), 0);

    let after = store.list_all()[0].clone();
    assert_eq!(after.id, before.id);
    assert_eq!(after.category, before.category);
    assert_eq!(after.body, before.body);
    assert_eq!(after.title, "Vote tomorrow");
    assert_eq!(after.formatted_timestamp(), before.formatted_timestamp());
    assert_eq!(journal_lines(&store), listed_lines(&store));
}

#[test]
fn test_edit_missing_id_changes_nothing() {
    let temp = TempDir::new().unwrap();
    let store = NewsStore::open(test_config(&temp)).unwrap();
    store.append("SPORTS", "a", "b").unwrap();
    let listed = listed_lines(&store);
    let journal = journal_lines(&store);

    let err = store
        .edit(
            77,
            RecordEdit {
                body: Some("new".into()),
                ..RecordEdit::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(77)));
    assert_eq!(listed_lines(&store), listed);
    assert_eq!(journal_lines(&store), journal);
}

/// Mixed appends, evictions and edits leave the journal equal to the
/// buffer, oldest first.
#[test]
fn test_journal_tracks_buffer() {
    let temp = TempDir::new().unwrap();
    let store = NewsStore::open(test_config(&temp).with_capacity(4)).unwrap();
    for i in 0..6 {
        store.append("TECHNOLOGY", &format!("chip {}", i), "fast").unwrap();
    }
    store.evict_oldest_manual().unwrap();
    let newest = store.list_all().last().unwrap().id;
    store
        .edit(
            newest,
            RecordEdit {
                category: Some("BREAKING".into()),
                ..RecordEdit::default()
            },
        )
        .unwrap();
    store.append("SPORTS", "late", "score").unwrap();

    assert_eq!(journal_lines(&store), listed_lines(&store));
    let ids: Vec<u64> = store.list_all().iter().map(|r| r.id).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted);
}

// =============================================================================
// Failed compaction
// =============================================================================

/// A compaction that cannot write its temp file leaves the old journal in
/// place, reports the error, and keeps the change in memory. The next
/// mutation brings the journal back in line.
#[test]
fn test_failed_edit_compaction_recovers_on_next_append() {
    let temp = TempDir::new().unwrap();
    let store = NewsStore::open(test_config(&temp)).unwrap();
    let id = store.append("SPORTS", "Kickoff", "at noon").unwrap();
    store.append("SPORTS", "Half time", "1-0").unwrap();
    let journal_before = journal_lines(&store);

    let blocker = temp_path_for(store.journal_path());
    fs::create_dir(&blocker).unwrap();

    let err = store
        .edit(
            id,
            RecordEdit {
                title: Some("Kickoff delayed".into()),
                ..RecordEdit::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.code(), "NEWS_JOURNAL_COMPACTION_FAILED");
    assert!(store.stats().journal_dirty);
    assert_eq!(journal_lines(&store), journal_before);
    assert_eq!(store.list_all()[0].title, "Kickoff delayed");
    assert_eq!(store.stats().metrics.compaction_failures, 1);

    fs::remove_dir(&blocker).unwrap();
    store.append("SPORTS", "Full time", "2-0").unwrap();

    assert!(!store.stats().journal_dirty);
    assert_eq!(journal_lines(&store), listed_lines(&store));
    assert_eq!(store.list_all().len(), 3);
}

/// The same holds for a manual eviction, with `sync` doing the catch-up.
#[test]
fn test_failed_evict_compaction_recovers_on_sync() {
    let temp = TempDir::new().unwrap();
    let store = NewsStore::open(test_config(&temp)).unwrap();
    store.append("WEATHER", "Storm", "wind").unwrap();
    store.append("WEATHER", "Calm", "sun").unwrap();
    let journal_before = journal_lines(&store);

    let blocker = temp_path_for(store.journal_path());
    fs::create_dir(&blocker).unwrap();

    let err = store.evict_oldest_manual().unwrap_err();
    assert_eq!(err.code(), "NEWS_JOURNAL_COMPACTION_FAILED");
    assert!(store.stats().journal_dirty);
    assert_eq!(journal_lines(&store), journal_before);
    assert_eq!(titles(&store.list_all()), vec!["Calm"]);

    assert!(store.sync().is_err());
    fs::remove_dir(&blocker).unwrap();
    store.sync().unwrap();

    assert!(!store.stats().journal_dirty);
    assert_eq!(journal_lines(&store), listed_lines(&store));
}
