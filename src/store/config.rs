//! Store configuration
//!
//! Read from a JSON file; every key is optional:
//!
//! ```json
//! {
//!   "journal_path": "news_database.txt",
//!   "capacity": 20,
//!   "soft_threshold": 18,
//!   "categories": ["BREAKING", "POLITICS", "SPORTS"],
//!   "max_text_len": 255,
//!   "read_pacing_ms": 250
//! }
//! ```
//!
//! `soft_threshold: null` disables proactive eviction. When the key is
//! absent the threshold follows the capacity (90%, rounded up).
//! `read_pacing_ms: null` makes reads block until a record exists.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{StoreError, StoreResult};
use crate::gate::EvictionPolicy;
use crate::record::{CategoryCatalog, DEFAULT_CATEGORIES};

/// Journal file used when none is configured.
pub const DEFAULT_JOURNAL_PATH: &str = "news_database.txt";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_journal_path")]
    pub journal_path: PathBuf,

    /// Buffer capacity N
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    #[serde(default = "default_soft_threshold_for_default_capacity")]
    pub soft_threshold: Option<usize>,

    #[serde(default = "default_categories")]
    pub categories: Vec<String>,

    /// Longest accepted title or body, in bytes
    #[serde(default = "default_max_text_len")]
    pub max_text_len: usize,

    /// Longest a read waits for the first record
    #[serde(default = "default_read_pacing_ms")]
    pub read_pacing_ms: Option<u64>,
}

fn default_journal_path() -> PathBuf {
    PathBuf::from(DEFAULT_JOURNAL_PATH)
}
fn default_capacity() -> usize {
    20
}
fn default_soft_threshold_for_default_capacity() -> Option<usize> {
    Some(default_soft_threshold(default_capacity()))
}
fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect()
}
fn default_max_text_len() -> usize {
    255
}
fn default_read_pacing_ms() -> Option<u64> {
    Some(250)
}

/// Soft threshold for a capacity: 18 for 20.
pub fn default_soft_threshold(capacity: usize) -> usize {
    capacity - capacity / 10
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            journal_path: default_journal_path(),
            capacity: default_capacity(),
            soft_threshold: default_soft_threshold_for_default_capacity(),
            categories: default_categories(),
            max_text_len: default_max_text_len(),
            read_pacing_ms: default_read_pacing_ms(),
        }
    }
}

impl StoreConfig {
    /// Defaults with the given journal path.
    pub fn new(journal_path: impl Into<PathBuf>) -> Self {
        Self {
            journal_path: journal_path.into(),
            ..Self::default()
        }
    }

    /// Sets the capacity and moves the soft threshold with it.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self.soft_threshold = Some(default_soft_threshold(capacity));
        self
    }

    pub fn with_soft_threshold(mut self, soft_threshold: Option<usize>) -> Self {
        self.soft_threshold = soft_threshold;
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_read_pacing(mut self, pacing: Option<Duration>) -> Self {
        self.read_pacing_ms = pacing.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Loads configuration from a JSON file. A missing file yields the
    /// defaults.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(StoreError::Config(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        Self::from_json(&content)
    }

    /// Parses and validates a JSON configuration document.
    pub fn from_json(content: &str) -> StoreResult<Self> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| StoreError::Config(format!("invalid config JSON: {}", e)))?;
        let threshold_given = value.get("soft_threshold").is_some();

        let mut config: StoreConfig = serde_json::from_value(value)
            .map_err(|e| StoreError::Config(format!("invalid config: {}", e)))?;
        if !threshold_given {
            config.soft_threshold = Some(default_soft_threshold(config.capacity));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.capacity == 0 {
            return Err(StoreError::Config("capacity must be > 0".into()));
        }
        if let Some(threshold) = self.soft_threshold {
            if threshold == 0 || threshold > self.capacity {
                return Err(StoreError::Config(format!(
                    "soft_threshold must be in 1..={}, got {}",
                    self.capacity, threshold
                )));
            }
        }
        if self.max_text_len == 0 {
            return Err(StoreError::Config("max_text_len must be > 0".into()));
        }
        if self.journal_path.as_os_str().is_empty() {
            return Err(StoreError::Config("journal_path must not be empty".into()));
        }
        self.catalog()?;
        Ok(())
    }

    /// Builds the category catalog.
    pub fn catalog(&self) -> StoreResult<CategoryCatalog> {
        CategoryCatalog::new(self.categories.iter().cloned())
            .map_err(|e| StoreError::Config(format!("invalid categories: {}", e)))
    }

    pub fn eviction_policy(&self) -> EvictionPolicy {
        EvictionPolicy::new(self.soft_threshold)
    }

    pub fn read_pacing(&self) -> Option<Duration> {
        self.read_pacing_ms.map(Duration::from_millis)
    }
}
