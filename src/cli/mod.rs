//! Command-line interface for newsdb
//!
//! - one-shot commands: add, edit, evict, list, query, categories, stats, reload
//! - serve: JSON requests on stdin, one response per line on stdout
//! - demo: timed producer/consumer run against the configured store

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, LogLevel};
pub use commands::{handle_request, run, run_cli, serve, serve_lines, Request};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_requests, write_error, write_response};
