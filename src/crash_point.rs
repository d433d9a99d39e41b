//! Crash point injection for durability testing
//!
//! Setting `NEWSDB_CRASH_POINT` to one of the names in [`points`] makes the
//! process abort the moment execution reaches that point: no cleanup, no
//! unwinding, no flushing of buffered state.
//!
//! ```bash
//! NEWSDB_CRASH_POINT=journal_before_rename newsdb evict
//! ```
//!
//! The next `open` must then find either the old journal or the new one,
//! never a mix, and discard any leftover temporary file.

use std::sync::OnceLock;

/// The env var is read once per process.
static CRASH_POINT: OnceLock<Option<String>> = OnceLock::new();

#[inline]
fn configured_point() -> Option<&'static str> {
    CRASH_POINT
        .get_or_init(|| std::env::var("NEWSDB_CRASH_POINT").ok())
        .as_deref()
}

/// Returns true if `NEWSDB_CRASH_POINT` equals `name`.
#[inline]
pub fn crash_point_enabled(name: &str) -> bool {
    configured_point().map(|p| p == name).unwrap_or(false)
}

/// Aborts the process if the named crash point is enabled.
#[inline]
pub fn maybe_crash(name: &str) {
    if crash_point_enabled(name) {
        eprintln!("[CRASH] Triggering crash at point: {}", name);
        std::process::abort();
    }
}

/// All defined crash point names
pub mod points {
    // Single-record append
    pub const JOURNAL_BEFORE_APPEND: &str = "journal_before_append";
    pub const JOURNAL_AFTER_APPEND: &str = "journal_after_append";

    // Compaction
    pub const JOURNAL_BEFORE_TEMP_WRITE: &str = "journal_before_temp_write";
    pub const JOURNAL_AFTER_TEMP_WRITE: &str = "journal_after_temp_write";
    pub const JOURNAL_BEFORE_RENAME: &str = "journal_before_rename";
    pub const JOURNAL_AFTER_RENAME: &str = "journal_after_rename";

    pub fn all() -> &'static [&'static str] {
        &[
            JOURNAL_BEFORE_APPEND,
            JOURNAL_AFTER_APPEND,
            JOURNAL_BEFORE_TEMP_WRITE,
            JOURNAL_AFTER_TEMP_WRITE,
            JOURNAL_BEFORE_RENAME,
            JOURNAL_AFTER_RENAME,
        ]
    }
}
