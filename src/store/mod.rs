//! Store facade
//!
//! [`NewsStore`] composes the ring buffer, the capacity and access gates and
//! the journal. After every completed mutation the journal's records equal
//! the buffer's, in order, unless a persistence failure was reported; then
//! the journal is marked dirty and the next mutation (or [`NewsStore::sync`])
//! rewrites it in full.

mod config;
mod errors;
mod facade;
mod ids;

pub use config::{default_soft_threshold, StoreConfig, DEFAULT_JOURNAL_PATH};
pub use errors::{StoreError, StoreResult};
pub use facade::{NewsStore, StoreStats};
pub use ids::IdAllocator;
