//! Record validation and parse errors

use thiserror::Error;

/// Result type for record operations
pub type RecordResult<T> = Result<T, RecordError>;

/// Errors raised while validating a record field or parsing a persisted line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    // Parse errors
    #[error("expected 5 fields, found {0}")]
    FieldCount(usize),

    #[error("invalid id: {0:?}")]
    InvalidId(String),

    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    // Validation errors
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("{field} is {len} bytes (max: {max})")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("{field} contains a reserved character ('|' or line break)")]
    ReservedCharacter { field: &'static str },

    #[error("duplicate category: {0}")]
    DuplicateCategory(String),
}

impl RecordError {
    /// Whether this error came from reading a persisted line
    /// (as opposed to validating caller input).
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            RecordError::FieldCount(_) | RecordError::InvalidId(_) | RecordError::InvalidTimestamp(_)
        )
    }
}
