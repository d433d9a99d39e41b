//! newsdb - a bounded, concurrent, durable news store
//!
//! A fixed-capacity ring buffer of news records shared by many producers and
//! readers, with a pipe-delimited journal on disk.
//!
//! - `record`: news records, categories and field validation
//! - `ring`: the fixed-capacity ring buffer
//! - `gate`: capacity gate and readers-writer access gate
//! - `journal`: append, atomic compaction and lenient load
//! - `store`: the facade tying the above together
//! - `observability`: structured logging, metrics, timed scopes

pub mod cli;
pub mod crash_point;
pub mod demo;
pub mod gate;
pub mod journal;
pub mod observability;
pub mod record;
pub mod ring;
pub mod store;
