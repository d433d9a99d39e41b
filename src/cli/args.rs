//! CLI argument definitions using clap
//!
//! Commands:
//! - newsdb add --category <c> --title <t> --body <b>
//! - newsdb edit <id> [--title <t>] [--body <b>] [--category <c>]
//! - newsdb evict | list | query <category> | categories | stats | reload
//! - newsdb serve (line-delimited JSON requests on stdin)
//! - newsdb demo

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::observability::Severity;

/// newsdb - a bounded news store backed by a compacting journal
#[derive(Parser, Debug)]
#[command(name = "newsdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (missing file means defaults)
    #[arg(long, global = true, default_value = "./newsdb.json")]
    pub config: PathBuf,

    /// Lowest log severity written to stderr
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Publish a news item
    Add {
        #[arg(long)]
        category: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        body: String,
        /// Give up after this many milliseconds if the buffer is full
        #[arg(long)]
        wait_ms: Option<u64>,
    },

    /// Change fields of an existing item
    Edit {
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        body: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },

    /// Remove the oldest item
    Evict,

    /// List every item, oldest first
    List,

    /// List the items in one category
    Query { category: String },

    /// Show the category catalog
    Categories,

    /// Show counters and gate state
    Stats,

    /// Rebuild the buffer from the journal
    Reload,

    /// Answer JSON requests from stdin, one per line
    Serve,

    /// Run the producer/consumer demonstration
    Demo {
        #[arg(long, default_value_t = 2)]
        producers: usize,
        #[arg(long, default_value_t = 5)]
        readers: usize,
        /// Items each producer publishes
        #[arg(long, default_value_t = 11)]
        items: usize,
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
        #[arg(long, default_value_t = 2000)]
        write_delay_ms: u64,
        #[arg(long, default_value_t = 1000)]
        read_delay_ms: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn severity(self) -> Severity {
        match self {
            LogLevel::Trace => Severity::Trace,
            LogLevel::Info => Severity::Info,
            LogLevel::Warn => Severity::Warn,
            LogLevel::Error => Severity::Error,
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
