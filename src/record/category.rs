//! Fixed category catalog
//!
//! The catalog is set once when the store opens and never changes while it is
//! running. Lookups are exact, case-sensitive string matches.

use super::errors::{RecordError, RecordResult};
use super::news::validate_text;

/// Longest accepted category name, in bytes.
pub const MAX_CATEGORY_LEN: usize = 19;

/// Catalog used when the configuration does not name one.
pub const DEFAULT_CATEGORIES: [&str; 6] = [
    "BREAKING",
    "POLITICS",
    "SPORTS",
    "TECHNOLOGY",
    "WEATHER",
    "ENTERTAINMENT",
];

/// Ordered, duplicate-free set of category names known at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCatalog {
    names: Vec<String>,
}

impl CategoryCatalog {
    /// Builds a catalog, validating every name.
    ///
    /// # Errors
    ///
    /// Returns `RecordError` for an empty catalog, an invalid name, or a
    /// duplicate.
    pub fn new<I, S>(names: I) -> RecordResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut validated: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            validate_text("category", &name, MAX_CATEGORY_LEN)?;
            if validated.contains(&name) {
                return Err(RecordError::DuplicateCategory(name));
            }
            validated.push(name);
        }
        if validated.is_empty() {
            return Err(RecordError::EmptyField { field: "categories" });
        }
        Ok(Self { names: validated })
    }

    /// Returns the name if it belongs to the catalog.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.names.iter().find(|n| n.as_str() == name).map(String::as_str)
    }

    /// Whether the name belongs to the catalog.
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Returns the category at a position (used by the demo harness to
    /// spread records across categories).
    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Iterates names in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// A valid catalog is never empty; provided for API completeness.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        Self {
            names: DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect(),
        }
    }
}
