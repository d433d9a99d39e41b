//! CLI-specific error types

use std::fmt;
use std::io;

use crate::store::StoreError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// The store could not be opened
    StoreOpenFailed,
    /// A request line was not a valid request
    InvalidRequest,
    /// The store rejected a request
    RequestFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "NEWS_CLI_CONFIG_ERROR",
            Self::IoError => "NEWS_CLI_IO_ERROR",
            Self::StoreOpenFailed => "NEWS_CLI_STORE_OPEN_FAILED",
            Self::InvalidRequest => "NEWS_CLI_INVALID_REQUEST",
            Self::RequestFailed => "NEWS_CLI_REQUEST_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn store_open_failed(err: &StoreError) -> Self {
        Self::new(
            CliErrorCode::StoreOpenFailed,
            format!("{}: {}", err.code(), err),
        )
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidRequest, msg)
    }

    /// A one-shot command the store refused; the JSON error response has
    /// already been written.
    pub fn request_failed(err: &StoreError) -> Self {
        Self::new(
            CliErrorCode::RequestFailed,
            format!("{}: {}", err.code(), err),
        )
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code() {
        let err = CliError::config_error("bad capacity");
        assert_eq!(err.to_string(), "NEWS_CLI_CONFIG_ERROR: bad capacity");
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
    }

    #[test]
    fn test_store_error_carries_store_code() {
        let err = CliError::request_failed(&StoreError::NotFound(9));
        assert_eq!(err.code_str(), "NEWS_CLI_REQUEST_FAILED");
        assert!(err.message().starts_with("NEWS_RECORD_NOT_FOUND"));
    }
}
