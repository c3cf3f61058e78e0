pub mod bracketed;
pub mod strict;

use serde_json::Value;
use thiserror::Error;

use crate::error::MockcatError;

use bracketed::BracketedParser;
use strict::StrictParser;

/// One generated row: field name to JSON value, in model-produced order.
pub type Record = serde_json::Map<String, Value>;

/// Why a stage could not turn model text into records.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("top-level JSON value is not an array")]
    NotAnArray,
    #[error("array element {index} is not an object")]
    NonObjectElement { index: usize },
    #[error("no bracketed array found")]
    NoBracketedArray,
}

/// Tagged result of a single parsing stage.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(Vec<Record>),
    Failed(ParseFailure),
}

/// A stage in the response parsing pipeline.
/// Each stage sees the raw model text independently.
pub trait RecordParser: Send + Sync {
    fn name(&self) -> &'static str;

    fn parse(&self, text: &str) -> ParseOutcome;
}

/// Stages tried in order; the first `Parsed` wins.
const PIPELINE: [&dyn RecordParser; 2] = [&StrictParser, &BracketedParser];

/// Parse model text into records: strict JSON first, then the first
/// bracketed `[...]` span. The returned sequence may be empty.
pub fn parse_records(text: &str) -> Result<Vec<Record>, MockcatError> {
    let mut last_failure = ParseFailure::NoBracketedArray;
    for stage in PIPELINE {
        match stage.parse(text) {
            ParseOutcome::Parsed(records) => {
                tracing::debug!(
                    stage = stage.name(),
                    records = records.len(),
                    "parsed model output"
                );
                return Ok(records);
            }
            ParseOutcome::Failed(reason) => {
                tracing::debug!(stage = stage.name(), "parse stage failed: {reason}");
                last_failure = reason;
            }
        }
    }
    Err(MockcatError::Parse(last_failure.to_string()))
}

/// Shared by all stages: a JSON array whose elements are all objects.
fn records_from_json(json: &str) -> ParseOutcome {
    let value: Value = match serde_json::from_str(json) {
        Ok(v) => v,
        Err(e) => return ParseOutcome::Failed(ParseFailure::InvalidJson(e.to_string())),
    };

    let Value::Array(items) = value else {
        return ParseOutcome::Failed(ParseFailure::NotAnArray);
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match item {
            Value::Object(map) => records.push(map),
            _ => return ParseOutcome::Failed(ParseFailure::NonObjectElement { index }),
        }
    }
    ParseOutcome::Parsed(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_json_is_preferred() {
        let records = parse_records(r#"[{"id": 1}, {"id": 2}]"#).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["id"], 2);
    }

    #[test]
    fn prose_falls_through_to_bracketed_stage() {
        let text = "Here you go:\n[{\"id\": 1}]\nEnjoy!";
        let records = parse_records(text).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn missing_array_is_a_parse_error() {
        let err = parse_records("I cannot help with that.").unwrap_err();
        assert!(matches!(err, MockcatError::Parse(_)));
    }

    #[test]
    fn object_wrapper_yields_inner_array() {
        let text = r#"{"records": [{"id": 7}]}"#;
        let records = parse_records(text).unwrap();
        assert_eq!(records[0]["id"], 7);
    }

    #[test]
    fn array_of_scalars_is_rejected() {
        let err = parse_records("[1, 2, 3]").unwrap_err();
        assert!(err.to_string().contains("element 0"), "got: {err}");
    }

    #[test]
    fn field_order_is_preserved() {
        let records = parse_records(r#"[{"zeta": 1, "alpha": 2, "mid": 3}]"#).unwrap();
        let keys: Vec<&str> = records[0].keys().map(String::as_str).collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn both_stages_agree_on_a_well_formed_array() {
        let array = r#"[{"id": 1, "name": "Ada", "tags": ["x"]}, {"id": 2, "name": null, "tags": []}]"#;
        let fenced = format!("```json\n{array}\n```");

        let strict = StrictParser.parse(array);
        assert!(matches!(strict, ParseOutcome::Parsed(ref r) if r.len() == 2));
        assert_eq!(BracketedParser.parse(array), strict);
        assert_eq!(BracketedParser.parse(&fenced), strict);
    }
}
