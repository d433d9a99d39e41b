//! CLI command implementations
//!
//! Every command opens the store, runs one request (or, for `serve`, one
//! request per input line), writes a JSON response to stdout and closes the
//! store. One-shot commands and `serve` share [`handle_request`].

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::demo::{run_demo, DemoConfig, StopFlag};
use crate::observability::{log_event_with_fields, Event, Logger};
use crate::record::RecordEdit;
use crate::store::{NewsStore, StoreConfig, StoreResult};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_requests, write_error, write_error_to, write_response, write_response_to};

/// Longest an append waits for a free slot when the request names no wait
/// and proactive eviction is off. The CLI has no other thread that could
/// free a slot.
pub const DEFAULT_APPEND_WAIT: Duration = Duration::from_millis(1000);

/// One store request, as a CLI command or a `serve` input line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Append {
        category: String,
        title: String,
        body: String,
        #[serde(default)]
        wait_ms: Option<u64>,
    },
    Edit {
        id: u64,
        #[serde(flatten)]
        changes: RecordEdit,
    },
    Evict,
    List,
    Query {
        category: String,
    },
    Categories,
    Stats,
    Reload,
    Sync,
}

/// Runs one request against an open store.
pub fn handle_request(store: &NewsStore, request: Request) -> StoreResult<Value> {
    match request {
        Request::Append {
            category,
            title,
            body,
            wait_ms,
        } => {
            let wait = match wait_ms {
                Some(ms) => Some(Duration::from_millis(ms)),
                None if store.config().soft_threshold.is_none() => Some(DEFAULT_APPEND_WAIT),
                None => None,
            };
            let id = match wait {
                Some(wait) => store.append_within(&category, &title, &body, wait)?,
                None => store.append(&category, &title, &body)?,
            };
            Ok(json!({ "id": id }))
        }
        Request::Edit { id, changes } => {
            let record = store.edit(id, changes)?;
            Ok(json!(record))
        }
        Request::Evict => {
            let evicted = store.evict_oldest_manual()?;
            Ok(json!({ "evicted": evicted }))
        }
        Request::List => Ok(json!(store.list_all())),
        Request::Query { category } => Ok(json!(store.query_by_category(&category))),
        Request::Categories => Ok(json!(store.categories().iter().collect::<Vec<_>>())),
        Request::Stats => Ok(json!(store.stats())),
        Request::Reload => {
            let report = store.reload()?;
            Ok(json!({
                "records": report.records.len(),
                "skipped": report.skipped,
            }))
        }
        Request::Sync => {
            store.sync()?;
            Ok(json!({ "synced": true }))
        }
    }
}

/// Parse arguments and run the command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_cli(cli)
}

pub fn run_cli(cli: Cli) -> CliResult<()> {
    Logger::set_min_severity(cli.log_level.severity());
    let config = load_config(&cli.config)?;

    let request = match cli.command {
        Command::Add {
            category,
            title,
            body,
            wait_ms,
        } => Request::Append {
            category,
            title,
            body,
            wait_ms,
        },
        Command::Edit {
            id,
            title,
            body,
            category,
        } => Request::Edit {
            id,
            changes: RecordEdit {
                title,
                body,
                category,
            },
        },
        Command::Evict => Request::Evict,
        Command::List => Request::List,
        Command::Query { category } => Request::Query { category },
        Command::Categories => Request::Categories,
        Command::Stats => Request::Stats,
        Command::Reload => Request::Reload,
        Command::Serve => return serve(single_client(config)?),
        Command::Demo {
            producers,
            readers,
            items,
            timeout_secs,
            write_delay_ms,
            read_delay_ms,
        } => {
            let demo = DemoConfig {
                producers,
                readers,
                items_per_producer: items,
                timeout: Duration::from_secs(timeout_secs),
                write_delay: Duration::from_millis(write_delay_ms),
                read_delay: Duration::from_millis(read_delay_ms),
                ..DemoConfig::default()
            };
            return demo_command(config, &demo);
        }
    };
    one_shot(single_client(config)?, request)
}

/// Rejects settings under which a lone client would wait forever: with
/// `read_pacing_ms: null` a read on an empty store blocks until some other
/// thread appends.
fn single_client(config: StoreConfig) -> CliResult<StoreConfig> {
    if config.read_pacing_ms.is_none() {
        return Err(CliError::config_error(
            "read_pacing_ms must be set for one-shot commands and serve",
        ));
    }
    Ok(config)
}

fn load_config(path: &Path) -> CliResult<StoreConfig> {
    let config = StoreConfig::load(path).map_err(|e| CliError::config_error(e.to_string()))?;
    log_event_with_fields(
        Event::ConfigLoaded,
        &[
            ("capacity", &config.capacity.to_string()),
            ("config_path", &path.display().to_string()),
            ("journal_path", &config.journal_path.display().to_string()),
        ],
    );
    Ok(config)
}

fn open_store(config: StoreConfig) -> CliResult<NewsStore> {
    NewsStore::open(config).map_err(|e| {
        let _ = write_error(e.code(), &e.to_string());
        CliError::store_open_failed(&e)
    })
}

fn close_store(store: NewsStore) -> CliResult<()> {
    store.close().map_err(|e| {
        let _ = write_error(e.code(), &e.to_string());
        CliError::request_failed(&e)
    })
}

fn one_shot(config: StoreConfig, request: Request) -> CliResult<()> {
    let store = open_store(config)?;
    let outcome = handle_request(&store, request);
    match outcome {
        Ok(data) => write_response(data)?,
        Err(e) => {
            write_error(e.code(), &e.to_string())?;
            let _ = store.close();
            return Err(CliError::request_failed(&e));
        }
    }
    close_store(store)
}

/// Serving loop: one JSON request per stdin line, one response per stdout
/// line. Store errors and malformed requests are answered and the loop
/// continues; a stdin read failure ends it.
pub fn serve(config: StoreConfig) -> CliResult<()> {
    let store = open_store(config)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    let result = serve_lines(&store, stdin.lock(), &mut stdout.lock());
    close_store(store)?;
    result
}

/// Answers every request line from `input` on `output`.
pub fn serve_lines<R: BufRead, W: Write>(
    store: &NewsStore,
    input: R,
    output: &mut W,
) -> CliResult<()> {
    for line in read_requests(input) {
        let value = match line {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                write_error_to(output, e.code_str(), e.message())?;
                continue;
            }
            Err(e) => {
                write_error_to(output, e.code_str(), e.message())?;
                return Err(e);
            }
        };

        let request: Request = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                let e = CliError::invalid_request(e.to_string());
                write_error_to(output, e.code_str(), e.message())?;
                continue;
            }
        };

        match handle_request(store, request) {
            Ok(data) => write_response_to(output, data)?,
            Err(e) => write_error_to(output, e.code(), &e.to_string())?,
        }
    }
    Ok(())
}

fn demo_command(config: StoreConfig, demo: &DemoConfig) -> CliResult<()> {
    let store = Arc::new(open_store(config)?);
    let outcome = run_demo(Arc::clone(&store), demo, StopFlag::new());
    let store = Arc::try_unwrap(store)
        .map_err(|_| CliError::io_error("demo workers still hold the store"))?;
    match outcome {
        Ok(report) => {
            write_response(json!({
                "report": report,
                "records": store.list_all(),
            }))?;
            close_store(store)
        }
        Err(e) => {
            write_error(e.code(), &e.to_string())?;
            let _ = store.close();
            Err(CliError::request_failed(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn open(temp: &TempDir) -> NewsStore {
        NewsStore::open(
            StoreConfig::new(temp.path().join("news.txt"))
                .with_read_pacing(Some(Duration::from_millis(10))),
        )
        .unwrap()
    }

    fn serve_input(store: &NewsStore, input: &str) -> Vec<Value> {
        let mut out = Vec::new();
        serve_lines(store, Cursor::new(input.to_string()), &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_request_parsing() {
        let request: Request = serde_json::from_str(
            r#"{"op":"edit","id":4,"title":"new title"}"#,
        )
        .unwrap();
        assert_eq!(
            request,
            Request::Edit {
                id: 4,
                changes: RecordEdit {
                    title: Some("new title".into()),
                    ..RecordEdit::default()
                },
            }
        );

        let request: Request = serde_json::from_str(r#"{"op":"evict"}"#).unwrap();
        assert_eq!(request, Request::Evict);
    }

    #[test]
    fn test_serve_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);
        let responses = serve_input(
            &store,
            concat!(
                r#"{"op":"append","category":"SPORTS","title":"Final","body":"Won"}"#,
                "\n",
                r#"{"op":"query","category":"SPORTS"}"#,
                "\n",
                r#"{"op":"edit","id":99,"title":"x"}"#,
                "\n",
                "garbage\n",
                r#"{"op":"fly"}"#,
                "\n",
                r#"{"op":"stats"}"#,
                "\n",
            ),
        );

        assert_eq!(responses.len(), 6);
        assert_eq!(responses[0]["data"]["id"], 1);
        assert_eq!(responses[1]["data"][0]["title"], "Final");
        assert_eq!(responses[2]["code"], "NEWS_RECORD_NOT_FOUND");
        assert_eq!(responses[3]["code"], "NEWS_CLI_INVALID_REQUEST");
        assert_eq!(responses[4]["code"], "NEWS_CLI_INVALID_REQUEST");
        assert_eq!(responses[5]["data"]["records"], 1);
    }

    #[test]
    fn test_serve_append_on_full_buffer_reports_backpressure() {
        let temp = TempDir::new().unwrap();
        let store = NewsStore::open(
            StoreConfig::new(temp.path().join("news.txt"))
                .with_capacity(1)
                .with_soft_threshold(None)
                .with_read_pacing(Some(Duration::from_millis(10))),
        )
        .unwrap();

        let responses = serve_input(
            &store,
            concat!(
                r#"{"op":"append","category":"SPORTS","title":"one","body":"b"}"#,
                "\n",
                r#"{"op":"append","category":"SPORTS","title":"two","body":"b"}"#,
                "\n",
                r#"{"op":"list"}"#,
                "\n",
            ),
        );

        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["data"]["id"], 1);
        assert_eq!(responses[1]["code"], "NEWS_BACKPRESSURE");
        assert_eq!(responses[2]["data"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_blocking_read_pacing_rejected_for_single_client() {
        let temp = TempDir::new().unwrap();
        let blocking = StoreConfig::new(temp.path().join("news.txt")).with_read_pacing(None);
        let err = single_client(blocking).unwrap_err();
        assert_eq!(err.code_str(), "NEWS_CLI_CONFIG_ERROR");

        let paced = StoreConfig::new(temp.path().join("news.txt"))
            .with_read_pacing(Some(Duration::from_millis(10)));
        assert!(single_client(paced).is_ok());
    }

    #[test]
    fn test_handle_evict_and_categories() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);

        let empty = handle_request(&store, Request::Evict).unwrap();
        assert!(empty["evicted"].is_null());

        let categories = handle_request(&store, Request::Categories).unwrap();
        assert_eq!(categories.as_array().unwrap().len(), 6);
        assert_eq!(categories[0], "BREAKING");
    }

    #[test]
    fn test_handle_unknown_category_append() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);
        let err = handle_request(
            &store,
            Request::Append {
                category: "GOSSIP".into(),
                title: "t".into(),
                body: "b".into(),
                wait_ms: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::UnknownCategory(_)));
    }
}
