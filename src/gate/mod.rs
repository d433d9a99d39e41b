//! Synchronization gates guarding the ring buffer
//!
//! - [`CapacityGate`]: free/used slot counting (producer backpressure and
//!   consumer pacing) plus the soft-threshold [`EvictionPolicy`]
//! - [`AccessGate`]: readers-writer exclusion with a separate
//!   producer-serialization lock
//!
//! Both are built on the counting [`Semaphore`] in this module.

mod access;
mod capacity;
mod semaphore;

pub use access::{AccessGate, AccessSnapshot, ProducerPermit, ReadGuard, WriteGuard, WriterSession};
pub use capacity::{CapacitySnapshot, CapacityGate, EvictionPolicy};
pub use semaphore::Semaphore;
pub(crate) use semaphore::lock_unpoisoned;
