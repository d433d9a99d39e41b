//! News records and their persisted line format
//!
//! A record is written as a single line:
//!
//! ```text
//! id|category|title|body|Www Mmm dd HH:MM:SS YYYY
//! ```
//!
//! The delimiter `|` and line breaks are rejected in every field at
//! construction time, so a line always splits back into exactly five fields.
//! Timestamps are UTC with whole-second precision; the sub-second part is
//! dropped when a record is created so the persisted form round-trips exactly.

mod category;
mod errors;
mod news;

pub use category::{CategoryCatalog, DEFAULT_CATEGORIES, MAX_CATEGORY_LEN};
pub use errors::{RecordError, RecordResult};
pub use news::{NewsRecord, RecordEdit, FIELD_DELIMITER, MAX_RECORD_ID, TIMESTAMP_FORMAT};
pub(crate) use news::validate_text;
