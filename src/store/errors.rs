//! # Store Errors

use thiserror::Error;

use crate::journal::JournalError;
use crate::record::RecordError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by [`NewsStore`](super::NewsStore) operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Persistence failed; see the journal error for the step
    #[error(transparent)]
    Journal(#[from] JournalError),

    #[error("No record with id {0}")]
    NotFound(u64),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Invalid field: {0}")]
    InvalidField(#[from] RecordError),

    /// Reload refused while a producer holds the writer lock
    #[error("A writer is active; try again later")]
    WriterActive,

    /// No free slot appeared within the caller's wait
    #[error("Buffer full: no free slot within {waited_ms} ms")]
    Backpressure { waited_ms: u64 },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl StoreError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Journal(e) => e.code().code(),
            StoreError::NotFound(_) => "NEWS_RECORD_NOT_FOUND",
            StoreError::UnknownCategory(_) => "NEWS_UNKNOWN_CATEGORY",
            StoreError::InvalidField(_) => "NEWS_INVALID_FIELD",
            StoreError::WriterActive => "NEWS_WRITER_ACTIVE",
            StoreError::Backpressure { .. } => "NEWS_BACKPRESSURE",
            StoreError::Config(_) => "NEWS_CONFIG_INVALID",
        }
    }

    /// Whether the caller may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::WriterActive | StoreError::Backpressure { .. }
        )
    }

    pub fn is_fatal(&self) -> bool {
        match self {
            StoreError::Journal(e) => e.is_fatal(),
            _ => false,
        }
    }
}
