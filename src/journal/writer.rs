//! Journal writer: single-record append and atomic compaction
//!
//! Compaction protocol:
//!
//! 1. write every record to `<journal>.tmp`
//! 2. flush and fsync the temp file, then close it
//! 3. rename the temp file over the journal (atomic on POSIX)
//! 4. fsync the parent directory so the rename is durable
//! 5. reopen the append handle on the new file
//!
//! A failure before step 3 removes the temp file and leaves the journal as
//! it was. A crash before step 3 leaves a temp file that the next open
//! discards.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::errors::{JournalError, JournalResult};
use crate::crash_point::{maybe_crash, points};
use crate::observability::{log_event_with_fields, Event};
use crate::record::NewsRecord;

/// Suffix of the temporary file a compaction writes before renaming.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Path of the compaction temp file for a journal.
pub fn temp_path_for(journal_path: &Path) -> PathBuf {
    let mut name = journal_path.as_os_str().to_owned();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

/// Deletes a temp file left by an interrupted compaction.
///
/// Returns whether one was found. The journal itself is never touched: a
/// compaction that did not reach its rename never replaced it.
pub fn discard_temp_artifacts(journal_path: &Path) -> JournalResult<bool> {
    let temp_path = temp_path_for(journal_path);
    if !temp_path.exists() {
        return Ok(false);
    }
    fs::remove_file(&temp_path).map_err(|e| JournalError::open_failed(&temp_path, e))?;
    log_event_with_fields(
        Event::JournalTempDiscarded,
        &[("path", &temp_path.display().to_string())],
    );
    Ok(true)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Append handle on the journal file.
#[derive(Debug)]
pub struct JournalWriter {
    path: PathBuf,
    temp_path: PathBuf,
    file: File,
}

impl JournalWriter {
    /// Opens the journal for append, creating it (and missing parent
    /// directories) if needed.
    ///
    /// # Errors
    ///
    /// `NEWS_JOURNAL_OPEN_FAILED` (FATAL) if the file cannot be opened.
    pub fn open(path: &Path) -> JournalResult<Self> {
        let dir = parent_dir(path);
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| JournalError::open_failed(path, e))?;
        }
        let file = Self::open_append(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            temp_path: temp_path_for(path),
            file,
        })
    }

    fn open_append(path: &Path) -> JournalResult<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| JournalError::open_failed(path, e))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Appends one record as a single line and syncs it.
    ///
    /// Returns the number of bytes written.
    pub fn append_one(&mut self, record: &NewsRecord) -> JournalResult<u64> {
        let mut line = record.to_line();
        line.push('\n');

        maybe_crash(points::JOURNAL_BEFORE_APPEND);

        self.file
            .write_all(line.as_bytes())
            .map_err(|e| JournalError::append_failed(record.id, e))?;
        self.file
            .flush()
            .map_err(|e| JournalError::append_failed(record.id, e))?;
        self.file
            .sync_data()
            .map_err(|e| JournalError::append_failed(record.id, e))?;

        maybe_crash(points::JOURNAL_AFTER_APPEND);

        log_event_with_fields(Event::JournalAppend, &[("id", &record.id.to_string())]);
        Ok(line.len() as u64)
    }

    /// Replaces the journal with exactly `records`, in order.
    ///
    /// Returns the number of bytes in the new journal.
    pub fn compact_rewrite<'a, I>(&mut self, records: I) -> JournalResult<u64>
    where
        I: IntoIterator<Item = &'a NewsRecord>,
    {
        let written = match self.write_temp(records) {
            Ok(written) => written,
            Err(e) => {
                let _ = fs::remove_file(&self.temp_path);
                return Err(e);
            }
        };

        maybe_crash(points::JOURNAL_BEFORE_RENAME);

        if let Err(e) = fs::rename(&self.temp_path, &self.path) {
            let _ = fs::remove_file(&self.temp_path);
            return Err(JournalError::compaction_failed("rename", e));
        }

        maybe_crash(points::JOURNAL_AFTER_RENAME);

        Self::sync_dir(parent_dir(&self.path))?;
        self.reopen()?;

        Ok(written)
    }

    /// Writes and syncs the temp file. Returns the byte count.
    fn write_temp<'a, I>(&self, records: I) -> JournalResult<u64>
    where
        I: IntoIterator<Item = &'a NewsRecord>,
    {
        maybe_crash(points::JOURNAL_BEFORE_TEMP_WRITE);

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.temp_path)
            .map_err(|e| JournalError::compaction_failed("temp create", e))?;

        let mut writer = BufWriter::new(file);
        let mut bytes = 0u64;
        for record in records {
            let mut line = record.to_line();
            line.push('\n');
            writer
                .write_all(line.as_bytes())
                .map_err(|e| JournalError::compaction_failed("temp write", e))?;
            bytes += line.len() as u64;
        }
        let file = writer
            .into_inner()
            .map_err(|e| JournalError::compaction_failed("temp flush", e.into_error()))?;
        file.sync_all()
            .map_err(|e| JournalError::compaction_failed("temp fsync", e))?;
        drop(file);

        maybe_crash(points::JOURNAL_AFTER_TEMP_WRITE);

        Ok(bytes)
    }

    #[cfg(unix)]
    fn sync_dir(dir: &Path) -> JournalResult<()> {
        let handle = OpenOptions::new()
            .read(true)
            .open(dir)
            .map_err(|e| JournalError::compaction_failed("directory open", e))?;
        handle
            .sync_all()
            .map_err(|e| JournalError::compaction_failed("directory fsync", e))
    }

    #[cfg(not(unix))]
    fn sync_dir(_dir: &Path) -> JournalResult<()> {
        Ok(())
    }

    /// Reopens the append handle on whatever file is now at the journal
    /// path.
    pub fn reopen(&mut self) -> JournalResult<()> {
        self.file = Self::open_append(&self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn record(id: u64, title: &str) -> NewsRecord {
        let at = Utc.with_ymd_and_hms(2024, 3, 4, 9, 15, 0).unwrap();
        NewsRecord::with_timestamp(id, "SPORTS", title, "body", at)
    }

    fn journal_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_temp_path_appends_suffix() {
        let path = Path::new("/data/news_database.txt");
        assert_eq!(temp_path_for(path), PathBuf::from("/data/news_database.txt.tmp"));
    }

    #[test]
    fn test_open_creates_missing_directories() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("news.txt");
        let writer = JournalWriter::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(writer.path(), path.as_path());
    }

    #[test]
    fn test_append_one_writes_a_line() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("news.txt");
        let mut writer = JournalWriter::open(&path).unwrap();

        let bytes = writer.append_one(&record(1, "first")).unwrap();
        writer.append_one(&record(2, "second")).unwrap();

        let lines = journal_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], record(1, "first").to_line());
        assert_eq!(bytes, lines[0].len() as u64 + 1);
    }

    #[test]
    fn test_compaction_replaces_contents() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("news.txt");
        let mut writer = JournalWriter::open(&path).unwrap();
        for id in 1..=4 {
            writer.append_one(&record(id, "t")).unwrap();
        }

        let kept = vec![record(3, "t"), record(4, "edited")];
        writer.compact_rewrite(&kept).unwrap();

        assert_eq!(
            journal_lines(&path),
            vec![kept[0].to_line(), kept[1].to_line()]
        );
        assert!(!writer.temp_path().exists());
    }

    #[test]
    fn test_append_after_compaction_goes_to_new_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("news.txt");
        let mut writer = JournalWriter::open(&path).unwrap();
        writer.append_one(&record(1, "old")).unwrap();
        writer.compact_rewrite(std::iter::empty()).unwrap();
        writer.append_one(&record(2, "new")).unwrap();

        assert_eq!(journal_lines(&path), vec![record(2, "new").to_line()]);
    }

    #[test]
    fn test_compaction_to_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("news.txt");
        let mut writer = JournalWriter::open(&path).unwrap();
        writer.append_one(&record(1, "a")).unwrap();
        let bytes = writer.compact_rewrite(&Vec::<NewsRecord>::new()).unwrap();
        assert_eq!(bytes, 0);
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_failed_compaction_leaves_journal_intact() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("news.txt");
        let mut writer = JournalWriter::open(&path).unwrap();
        writer.append_one(&record(1, "kept")).unwrap();

        // A directory where the temp file should go makes the temp create fail.
        fs::create_dir(temp_path_for(&path)).unwrap();
        let err = writer.compact_rewrite(&vec![record(9, "lost")]).unwrap_err();

        assert_eq!(
            err.code(),
            super::super::errors::JournalErrorCode::NewsJournalCompactionFailed
        );
        assert_eq!(journal_lines(&path), vec![record(1, "kept").to_line()]);
    }

    #[test]
    fn test_discard_temp_artifacts() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("news.txt");
        assert!(!discard_temp_artifacts(&path).unwrap());

        fs::write(temp_path_for(&path), "1|SPORTS|half|written").unwrap();
        assert!(discard_temp_artifacts(&path).unwrap());
        assert!(!temp_path_for(&path).exists());
    }
}
