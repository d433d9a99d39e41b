//! Observability for the news store
//!
//! - Structured JSON log lines on stderr
//! - Typed lifecycle events
//! - Lock-free operational counters
//!
//! Observability is read-only: nothing here changes what the store does,
//! and a failed log write is ignored.
//!
//! ```ignore
//! use newsdb::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::RecordEvicted, &[("id", "7")]);
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsSnapshot, StoreMetrics};
pub use scope::{ObservationScope, Timer};

/// Log a lifecycle event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
