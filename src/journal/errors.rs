//! Journal error types
//!
//! Error codes:
//! - NEWS_JOURNAL_OPEN_FAILED (FATAL severity)
//! - NEWS_JOURNAL_APPEND_FAILED (ERROR severity)
//! - NEWS_JOURNAL_COMPACTION_FAILED (ERROR severity)
//! - NEWS_JOURNAL_READ_FAILED (ERROR severity)

use std::fmt;
use std::io;
use std::path::Path;

use crate::observability::Severity;

/// Journal error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalErrorCode {
    /// Journal could not be opened or created
    NewsJournalOpenFailed,
    /// Writing a single record failed
    NewsJournalAppendFailed,
    /// Rewriting the journal failed; the previous journal is intact
    NewsJournalCompactionFailed,
    /// Reading the journal failed
    NewsJournalReadFailed,
}

impl JournalErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            JournalErrorCode::NewsJournalOpenFailed => "NEWS_JOURNAL_OPEN_FAILED",
            JournalErrorCode::NewsJournalAppendFailed => "NEWS_JOURNAL_APPEND_FAILED",
            JournalErrorCode::NewsJournalCompactionFailed => "NEWS_JOURNAL_COMPACTION_FAILED",
            JournalErrorCode::NewsJournalReadFailed => "NEWS_JOURNAL_READ_FAILED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            JournalErrorCode::NewsJournalOpenFailed => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for JournalErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Journal error with code, context and the underlying I/O failure
#[derive(Debug)]
pub struct JournalError {
    code: JournalErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl JournalError {
    pub fn open_failed(path: &Path, source: io::Error) -> Self {
        Self {
            code: JournalErrorCode::NewsJournalOpenFailed,
            message: "failed to open journal".to_string(),
            details: Some(format!("path: {}", path.display())),
            source: Some(source),
        }
    }

    pub fn append_failed(record_id: u64, source: io::Error) -> Self {
        Self {
            code: JournalErrorCode::NewsJournalAppendFailed,
            message: "failed to append record".to_string(),
            details: Some(format!("record_id: {}", record_id)),
            source: Some(source),
        }
    }

    /// Compaction failure at a named step (temp write, rename, ...).
    pub fn compaction_failed(step: &str, source: io::Error) -> Self {
        Self {
            code: JournalErrorCode::NewsJournalCompactionFailed,
            message: format!("journal compaction failed during {}", step),
            details: None,
            source: Some(source),
        }
    }

    pub fn read_failed(path: &Path, source: io::Error) -> Self {
        Self {
            code: JournalErrorCode::NewsJournalReadFailed,
            message: "failed to read journal".to_string(),
            details: Some(format!("path: {}", path.display())),
            source: Some(source),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> JournalErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns true if the store cannot continue after this error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for JournalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        if let Some(ref source) = self.source {
            write!(f, ": {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for JournalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for journal operations
pub type JournalResult<T> = Result<T, JournalError>;
