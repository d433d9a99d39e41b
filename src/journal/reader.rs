//! Journal loading
//!
//! Loading is lenient: a line that does not parse is logged, counted and
//! skipped, and its neighbours still load. Blank lines are ignored. Only an
//! I/O failure aborts the load.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::errors::{JournalError, JournalResult};
use crate::observability::{log_event_with_fields, Event};
use crate::record::NewsRecord;

/// A line that was not loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLine {
    /// 1-based line number in the journal
    pub line_number: usize,
    pub reason: String,
}

/// Outcome of reading a journal from the start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Records in file order
    pub records: Vec<NewsRecord>,
    pub skipped: Vec<SkippedLine>,
}

impl LoadReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn max_id(&self) -> Option<u64> {
        self.records.iter().map(|r| r.id).max()
    }
}

/// Sequential reader over a journal file.
pub struct JournalReader {
    path: PathBuf,
    reader: BufReader<File>,
    line_number: usize,
}

impl JournalReader {
    pub fn open(path: &Path) -> JournalResult<Self> {
        let file = File::open(path).map_err(|e| JournalError::read_failed(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            line_number: 0,
        })
    }

    /// Reads the next non-blank line.
    ///
    /// Returns `Ok(None)` at end of file, and `Ok(Some(Err(..)))` for a line
    /// that is present but unusable.
    pub fn read_next(&mut self) -> JournalResult<Option<Result<NewsRecord, SkippedLine>>> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| JournalError::read_failed(&self.path, e))?;
            if read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line,
                Err(_) => return Ok(Some(Err(self.skip("line is not valid UTF-8")))),
            };
            if line.trim().is_empty() {
                continue;
            }
            return Ok(Some(
                NewsRecord::from_line(line).map_err(|e| self.skip(&e.to_string())),
            ));
        }
    }

    fn skip(&self, reason: &str) -> SkippedLine {
        SkippedLine {
            line_number: self.line_number,
            reason: reason.to_string(),
        }
    }
}

/// Reads every record in the journal.
///
/// A missing journal loads as empty.
pub fn load_all(path: &Path) -> JournalResult<LoadReport> {
    let mut reader = match JournalReader::open(path) {
        Ok(reader) => reader,
        Err(_) if !path.exists() => return Ok(LoadReport::default()),
        Err(e) => return Err(e),
    };

    let mut report = LoadReport::default();
    while let Some(entry) = reader.read_next()? {
        match entry {
            Ok(record) => report.records.push(record),
            Err(skipped) => {
                log_event_with_fields(
                    Event::JournalLineSkipped,
                    &[
                        ("line", &skipped.line_number.to_string()),
                        ("path", &path.display().to_string()),
                        ("reason", &skipped.reason),
                    ],
                );
                report.skipped.push(skipped);
            }
        }
    }
    Ok(report)
}
