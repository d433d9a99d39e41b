//! Durable journal of news records
//!
//! The journal is the only persistence mechanism. It holds one line per
//! record, in the buffer's logical order, and is kept equal to the buffer
//! after every completed mutation:
//!
//! - an insert appends one line
//! - an eviction or edit rewrites the whole file through a temp file and an
//!   atomic rename
//!
//! Loading never aborts on a bad line; see [`load_all`].

mod errors;
mod reader;
mod writer;

pub use errors::{JournalError, JournalErrorCode, JournalResult};
pub use reader::{load_all, JournalReader, LoadReport, SkippedLine};
pub use writer::{discard_temp_artifacts, temp_path_for, JournalWriter, TEMP_SUFFIX};
