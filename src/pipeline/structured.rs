//! Recover JSON from free-form model output.
//!
//! Models wrap their JSON in prose, markdown fences or both. Each extractor
//! tries, in order:
//!
//! 1. every fenced block (```` ``` ````), with an optional `json` tag stripped;
//! 2. the whole trimmed response;
//! 3. the span from the first opening bracket to the last closing bracket.
//!
//! The first candidate that parses into the expected shape wins.

use crate::error::ExtractionError;
use serde_json::{Map, Value};

/// Extract a JSON object.
pub fn extract_object(raw: &str) -> Result<Map<String, Value>, ExtractionError> {
    extract_with(raw, '{', '}', |value| match value {
        Value::Object(map) => Some(map),
        _ => None,
    })
}

/// Extract a JSON array. An object wrapping exactly one array, such as
/// `{"questions": [...]}`, yields that array.
pub fn extract_array(raw: &str) -> Result<Vec<Value>, ExtractionError> {
    extract_with(raw, '[', ']', |value| match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => {
            let mut arrays = map.into_iter().filter_map(|(_, v)| match v {
                Value::Array(items) => Some(items),
                _ => None,
            });
            match (arrays.next(), arrays.next()) {
                (Some(items), None) => Some(items),
                _ => None,
            }
        }
        _ => None,
    })
}

fn extract_with<T>(
    raw: &str,
    open: char,
    close: char,
    accept: impl Fn(Value) -> Option<T>,
) -> Result<T, ExtractionError> {
    let parse = |candidate: &str| serde_json::from_str::<Value>(candidate).ok().and_then(&accept);

    if raw.contains("```") {
        for block in raw.split("```").skip(1).step_by(2) {
            let block = block.trim();
            let block = block
                .strip_prefix("json")
                .or_else(|| block.strip_prefix("JSON"))
                .unwrap_or(block);
            if let Some(found) = parse(block.trim()) {
                return Ok(found);
            }
        }
    }

    if let Some(found) = parse(raw.trim()) {
        return Ok(found);
    }

    if let (Some(start), Some(end)) = (raw.find(open), raw.rfind(close)) {
        if start < end {
            if let Some(found) = parse(&raw[start..=end]) {
                return Ok(found);
            }
        }
    }

    Err(ExtractionError::NoJson)
}
