//! Observable store events
//!
//! Events are explicit and typed; the logger only ever sees their string
//! names.

use std::fmt;

use super::logger::Severity;

/// Observable events in the news store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Store closed after final flush
    StoreClosed,
    /// Configuration loaded
    ConfigLoaded,

    // Journal
    /// Journal could not be opened for append
    JournalOpenFailed,
    /// One record appended to the journal
    JournalAppend,
    /// Journal append failed; the record was not stored
    JournalAppendFailed,
    /// Leftover temporary rewrite file removed at open
    JournalTempDiscarded,
    /// Malformed journal line ignored while loading
    JournalLineSkipped,
    /// Journal held more records than the buffer; oldest dropped
    JournalTrimmed,

    // Records
    /// New record stored
    RecordAppended,
    /// Record edited in place
    RecordEdited,
    /// Oldest record removed
    RecordEvicted,
    /// Producer gave up waiting for a free slot
    ProducerBackpressure,
    /// Read served to a consumer
    QueryServed,

    // Reload
    /// Buffer rebuilt from the journal
    ReloadComplete,
    /// Reload refused while a producer holds the writer lock
    ReloadRefused,

    // Demo harness
    /// Demo workers started
    DemoStart,
    /// Stop requested, workers winding down
    DemoStopRequested,
    /// All demo workers joined
    DemoComplete,
}

impl Event {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::StoreClosed => "STORE_CLOSED",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::JournalOpenFailed => "JOURNAL_OPEN_FAILED",
            Event::JournalAppend => "JOURNAL_APPEND",
            Event::JournalAppendFailed => "JOURNAL_APPEND_FAILED",
            Event::JournalTempDiscarded => "JOURNAL_TEMP_DISCARDED",
            Event::JournalLineSkipped => "JOURNAL_LINE_SKIPPED",
            Event::JournalTrimmed => "JOURNAL_TRIMMED",
            Event::RecordAppended => "RECORD_APPENDED",
            Event::RecordEdited => "RECORD_EDITED",
            Event::RecordEvicted => "RECORD_EVICTED",
            Event::ProducerBackpressure => "PRODUCER_BACKPRESSURE",
            Event::QueryServed => "QUERY_SERVED",
            Event::ReloadComplete => "RELOAD_COMPLETE",
            Event::ReloadRefused => "RELOAD_REFUSED",
            Event::DemoStart => "DEMO_START",
            Event::DemoStopRequested => "DEMO_STOP_REQUESTED",
            Event::DemoComplete => "DEMO_COMPLETE",
        }
    }

    /// Returns true if this event means the store cannot continue
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::JournalOpenFailed)
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::JournalOpenFailed => Severity::Fatal,
            Event::JournalAppendFailed => Severity::Error,
            Event::JournalTempDiscarded
            | Event::JournalLineSkipped
            | Event::JournalTrimmed
            | Event::ProducerBackpressure
            | Event::ReloadRefused => Severity::Warn,
            Event::JournalAppend | Event::QueryServed => Severity::Trace,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
