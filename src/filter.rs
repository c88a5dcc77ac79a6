use crate::normalize::NormalizedAuthor;
use serde_json::{Map, Value};
use thiserror::Error;

/// One JSON object read from a single archive line. Key order is preserved.
pub type Record = Map<String, Value>;

#[derive(Debug, Error)]
#[error("line is not a JSON object: {0}")]
pub struct ParseError(#[from] serde_json::Error);

pub fn parse_record(line: &str) -> Result<Record, ParseError> {
    Ok(serde_json::from_str::<Record>(line)?)
}

/// `metadata.author`, or `""` when the chain is absent or not a string.
pub fn author_of(record: &Record) -> &str {
    record
        .get("metadata")
        .and_then(|m| m.get("author"))
        .and_then(Value::as_str)
        .unwrap_or("")
}

/// Outcome of filtering one line, kept apart so per-file statistics can
/// tell noise from non-matches.
#[derive(Debug)]
pub enum LineOutcome {
    Blank,
    Unparseable,
    Skipped,
    Matched(Record),
}

pub fn classify_line(line: &str, target: &NormalizedAuthor) -> LineOutcome {
    let line = line.trim();
    if line.is_empty() {
        return LineOutcome::Blank;
    }
    let record = match parse_record(line) {
        Ok(record) => record,
        Err(_) => return LineOutcome::Unparseable,
    };
    if target.matches(author_of(&record)) {
        LineOutcome::Matched(record)
    } else {
        LineOutcome::Skipped
    }
}

pub fn filter_line(line: &str, target: &NormalizedAuthor) -> Option<Record> {
    match classify_line(line, target) {
        LineOutcome::Matched(record) => Some(record),
        _ => None,
    }
}
