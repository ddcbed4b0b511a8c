//! Extracts trial metrics from the tuning binary's stdout.
//!
//! The binary may print any amount of progress text; only the last non-empty
//! line of stdout carries the result, as a JSON object.

use serde_json::Value;
use thiserror::Error;
use tracing::warn;
use ts_types::TrialResult;

/// Why a stdout capture produced no usable result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseFailure {
    #[error("no output")]
    NoOutput,

    #[error("last line is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("last line is JSON {0}, not an object")]
    NotAnObject(&'static str),
}

/// Decode the last non-empty line of `stdout` as a metrics object.
pub fn try_parse(stdout: &str) -> Result<TrialResult, ParseFailure> {
    let line = stdout
        .lines()
        .map(str::trim)
        .rev()
        .find(|line| !line.is_empty())
        .ok_or(ParseFailure::NoOutput)?;

    match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(metrics)) => Ok(TrialResult::from_metrics(metrics)),
        Ok(other) => Err(ParseFailure::NotAnObject(json_kind(&other))),
        Err(e) => Err(ParseFailure::InvalidJson(e.to_string())),
    }
}

/// Like [`try_parse`], but every failure becomes an empty result.
pub fn parse(stdout: &str) -> TrialResult {
    try_parse(stdout).unwrap_or_else(|failure| {
        warn!("Discarding trial output: {}", failure);
        TrialResult::empty()
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_and_garbage_yield_empty_result() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n  \n").is_empty());
        assert!(parse("not json").is_empty());
        assert!(parse("[1,2,3]").is_empty());
        assert!(parse("3.14").is_empty());
        assert!(parse("{\"a\": 1").is_empty());
    }

    #[test]
    fn failure_reasons() {
        assert_eq!(try_parse(""), Err(ParseFailure::NoOutput));
        assert_eq!(try_parse("[1,2,3]"), Err(ParseFailure::NotAnObject("array")));
        assert!(matches!(
            try_parse("not json"),
            Err(ParseFailure::InvalidJson(_))
        ));
    }

    #[test]
    fn only_last_line_counts() {
        let result = parse("garbage\n{\"val_bpt\": 3.14}");
        assert_eq!(result.metrics(), json!({"val_bpt": 3.14}).as_object().unwrap());
    }

    #[test]
    fn last_line_wins() {
        let result = parse("{\"a\":1}\n{\"a\":2}");
        assert_eq!(result.metrics(), json!({"a": 2}).as_object().unwrap());
    }

    #[test]
    fn trailing_blank_lines_skipped() {
        let stdout = "Reading dataset\nTraining\n{\"train_inf_gain\": 0.5}\n\r\n   \n";
        assert_eq!(parse(stdout).metric("train_inf_gain"), Some(0.5));
    }

    #[test]
    fn earlier_json_is_ignored_when_last_line_is_garbage() {
        assert!(parse("{\"a\":1}\ndone").is_empty());
    }

    #[test]
    fn keys_are_not_filtered() {
        let result = parse("{\"val_bpt\": 1.0, \"training_time\": 12.5, \"tag\": \"x\"}");
        assert_eq!(result.len(), 3);
        assert_eq!(result.get("tag"), Some(&json!("x")));
    }
}
