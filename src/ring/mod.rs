//! Fixed-capacity circular buffer of news records
//!
//! The buffer holds the currently retained records in FIFO order. It does no
//! locking of its own: every caller reaches it through the store, which holds
//! the access gate (and the buffer mutex) around each call.
//!
//! # Invariants
//!
//! - `count <= capacity`
//! - `end == (start + count) % capacity`
//! - logical order is `slots[(start + i) % capacity]` for `i in 0..count`
//! - insertion only at `end`, removal only at `start`

mod buffer;

pub use buffer::{RingBuffer, RingFull};
