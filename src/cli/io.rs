//! JSON I/O handling for the CLI
//!
//! - Input: one JSON request per line on stdin (`serve`)
//! - Output: one JSON object per line on stdout
//! - Logs never go to stdout

use std::io::{self, BufRead, Write};

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Iterates request lines from a reader, skipping blank ones.
///
/// A line that is not JSON yields `Ok(Err(..))` so the caller can answer it
/// and carry on; only a read failure is an outer error.
pub fn read_requests<R: BufRead>(
    reader: R,
) -> impl Iterator<Item = CliResult<Result<Value, CliError>>> {
    reader
        .lines()
        .filter(|line| !matches!(line, Ok(l) if l.trim().is_empty()))
        .map(|line| {
            let line = line.map_err(CliError::from)?;
            Ok(serde_json::from_str(&line)
                .map_err(|e| CliError::invalid_request(format!("invalid JSON: {}", e))))
        })
}

/// Write a success response
pub fn write_response_to<W: Write>(writer: &mut W, data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });
    serde_json::to_writer(&mut *writer, &response)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Write an error response
pub fn write_error_to<W: Write>(writer: &mut W, code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });
    serde_json::to_writer(&mut *writer, &response)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    write_response_to(&mut io::stdout().lock(), data)
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    write_error_to(&mut io::stdout().lock(), code, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_response_shape() {
        let mut out = Vec::new();
        write_response_to(&mut out, serde_json::json!({"id": 3})).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with('\n'));
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["data"]["id"], 3);
    }

    #[test]
    fn test_error_shape() {
        let mut out = Vec::new();
        write_error_to(&mut out, "NEWS_RECORD_NOT_FOUND", "No record with id 4").unwrap();
        let parsed: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed["status"], "error");
        assert_eq!(parsed["code"], "NEWS_RECORD_NOT_FOUND");
        assert_eq!(parsed["message"], "No record with id 4");
    }

    #[test]
    fn test_read_requests_skips_blank_and_reports_bad_json() {
        let input = Cursor::new("{\"op\":\"list\"}\n\n   \nnot json\n{\"op\":\"stats\"}\n");
        let requests: Vec<_> = read_requests(input).map(|r| r.unwrap()).collect();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].as_ref().unwrap()["op"], "list");
        assert!(requests[1].is_err());
        assert_eq!(requests[2].as_ref().unwrap()["op"], "stats");
    }
}
