//! The news record value type and its line encoding

use std::fmt;

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{RecordError, RecordResult};

/// Separator between fields of a persisted line.
pub const FIELD_DELIMITER: char = '|';

/// Fixed-width timestamp format, e.g. `Mon Mar 04 09:15:00 2024`.
pub const TIMESTAMP_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// Largest id a persisted line may carry. One id is held back so the
/// allocator can always step past the largest loaded id.
pub const MAX_RECORD_ID: u64 = u64::MAX - 1;

/// Number of fields in a persisted line.
const FIELD_COUNT: usize = 5;

/// One stored news item.
///
/// Created once on the producer path. An edit builds a replacement record
/// that keeps `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsRecord {
    /// Unique, monotonically assigned identifier
    pub id: u64,
    /// Category name from the store's catalog
    pub category: String,
    /// Headline
    pub title: String,
    /// Article text
    pub body: String,
    /// Creation time, whole seconds, UTC
    pub created_at: DateTime<Utc>,
}

/// Fields to replace during an edit. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEdit {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl RecordEdit {
    /// Whether the edit changes nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none() && self.category.is_none()
    }
}

impl NewsRecord {
    /// Creates a record stamped with the current time.
    pub fn create(
        id: u64,
        category: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::with_timestamp(id, category, title, body, Utc::now())
    }

    /// Creates a record with an explicit timestamp (truncated to seconds).
    pub fn with_timestamp(
        id: u64,
        category: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            category: category.into(),
            title: title.into(),
            body: body.into(),
            created_at: created_at.trunc_subsecs(0),
        }
    }

    /// Builds the replacement record for an edit. Only the named fields
    /// change; id and timestamp are kept.
    pub fn revised(&self, edit: &RecordEdit) -> Self {
        Self {
            id: self.id,
            category: edit.category.clone().unwrap_or_else(|| self.category.clone()),
            title: edit.title.clone().unwrap_or_else(|| self.title.clone()),
            body: edit.body.clone().unwrap_or_else(|| self.body.clone()),
            created_at: self.created_at,
        }
    }

    /// Formats the creation time the way it is persisted.
    pub fn formatted_timestamp(&self) -> String {
        self.created_at.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Encodes the record as one journal line, without the trailing newline.
    pub fn to_line(&self) -> String {
        format!(
            "{}{d}{}{d}{}{d}{}{d}{}",
            self.id,
            self.category,
            self.title,
            self.body,
            self.formatted_timestamp(),
            d = FIELD_DELIMITER
        )
    }

    /// Parses one journal line.
    ///
    /// # Errors
    ///
    /// Returns a parse-class `RecordError` on a wrong field count, a
    /// non-numeric id, or a timestamp that does not match `TIMESTAMP_FORMAT`.
    pub fn from_line(line: &str) -> RecordResult<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
        if fields.len() != FIELD_COUNT {
            return Err(RecordError::FieldCount(fields.len()));
        }

        let id = fields[0]
            .parse::<u64>()
            .ok()
            .filter(|id| *id <= MAX_RECORD_ID)
            .ok_or_else(|| RecordError::InvalidId(fields[0].to_string()))?;

        let created_at = NaiveDateTime::parse_from_str(fields[4], TIMESTAMP_FORMAT)
            .map_err(|_| RecordError::InvalidTimestamp(fields[4].to_string()))?
            .and_utc();

        Ok(Self {
            id,
            category: fields[1].to_string(),
            title: fields[2].to_string(),
            body: fields[3].to_string(),
            created_at,
        })
    }
}

impl fmt::Display for NewsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} [{}] {} ({})",
            self.id,
            self.category,
            self.title,
            self.formatted_timestamp()
        )
    }
}

/// Checks a caller-supplied text field before it can reach the journal.
pub(crate) fn validate_text(field: &'static str, value: &str, max_len: usize) -> RecordResult<()> {
    if value.trim().is_empty() {
        return Err(RecordError::EmptyField { field });
    }
    if value.len() > max_len {
        return Err(RecordError::FieldTooLong {
            field,
            len: value.len(),
            max: max_len,
        });
    }
    if value.contains(|c: char| c == FIELD_DELIMITER || c == '\n' || c == '\r') {
        return Err(RecordError::ReservedCharacter { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> NewsRecord {
        NewsRecord::with_timestamp(
            7,
            "SPORTS",
            "Last-ball thriller",
            "A six off the final delivery seals it.",
            Utc.with_ymd_and_hms(2024, 3, 4, 9, 15, 0).unwrap(),
        )
    }

    #[test]
    fn test_line_layout() {
        assert_eq!(
            sample().to_line(),
            "7|SPORTS|Last-ball thriller|A six off the final delivery seals it.|Mon Mar 04 09:15:00 2024"
        );
    }

    #[test]
    fn test_line_parses_back() {
        let record = sample();
        assert_eq!(NewsRecord::from_line(&record.to_line()).unwrap(), record);
    }

    #[test]
    fn test_parse_tolerates_crlf() {
        let line = format!("{}\r\n", sample().to_line());
        assert_eq!(NewsRecord::from_line(&line).unwrap(), sample());
    }

    #[test]
    fn test_parse_rejects_field_count() {
        assert_eq!(
            NewsRecord::from_line("1|SPORTS|title|Mon Mar 04 09:15:00 2024"),
            Err(RecordError::FieldCount(4))
        );
    }

    #[test]
    fn test_parse_rejects_bad_id() {
        let err = NewsRecord::from_line("x|SPORTS|t|b|Mon Mar 04 09:15:00 2024").unwrap_err();
        assert_eq!(err, RecordError::InvalidId("x".into()));
    }

    #[test]
    fn test_parse_rejects_id_at_top_of_range() {
        let line = format!("{}|SPORTS|t|b|Mon Mar 04 09:15:00 2024", u64::MAX);
        let err = NewsRecord::from_line(&line).unwrap_err();
        assert_eq!(err, RecordError::InvalidId(u64::MAX.to_string()));

        let line = format!("{}|SPORTS|t|b|Mon Mar 04 09:15:00 2024", MAX_RECORD_ID);
        assert_eq!(NewsRecord::from_line(&line).unwrap().id, MAX_RECORD_ID);
    }

    #[test]
    fn test_parse_rejects_bad_timestamp() {
        let err = NewsRecord::from_line("1|SPORTS|t|b|yesterday").unwrap_err();
        assert!(matches!(err, RecordError::InvalidTimestamp(_)));
    }

    #[test]
    fn test_create_truncates_subseconds() {
        let record = NewsRecord::create(1, "SPORTS", "t", "b");
        assert_eq!(record.created_at.timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_revised_keeps_identity() {
        let original = sample();
        let edit = RecordEdit {
            title: Some("New headline".into()),
            ..Default::default()
        };
        let revised = original.revised(&edit);
        assert_eq!(revised.id, original.id);
        assert_eq!(revised.created_at, original.created_at);
        assert_eq!(revised.category, original.category);
        assert_eq!(revised.body, original.body);
        assert_eq!(revised.title, "New headline");
    }

    #[test]
    fn test_validate_text() {
        assert!(validate_text("title", "ok", 10).is_ok());
        assert_eq!(
            validate_text("title", "  ", 10),
            Err(RecordError::EmptyField { field: "title" })
        );
        assert!(matches!(
            validate_text("title", "a|b", 10),
            Err(RecordError::ReservedCharacter { .. })
        ));
        assert!(matches!(
            validate_text("body", "line\nbreak", 20),
            Err(RecordError::ReservedCharacter { .. })
        ));
        assert!(matches!(
            validate_text("body", "0123456789x", 10),
            Err(RecordError::FieldTooLong { len: 11, .. })
        ));
    }
}
