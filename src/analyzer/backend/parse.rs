//! Response parsing for model sessions.
//!
//! Sessions return free text that usually, but not always, contains JSON.
//! This module accepts every shape seen in practice and produces typed
//! records, or a `BackendError` when nothing usable is found:
//!
//! 1. A bare JSON array of suggestion objects
//! 2. An object carrying a `suggestions` (or `corrections`) array
//! 3. Either of the above inside a markdown code block
//! 4. Either of the above embedded in surrounding prose
//!
//! Field values are lenient: missing, null, negative or fractional numbers
//! and non-string text fields are coerced instead of rejected.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::{BackendError, BackendResult};

/// Suggestion as returned by a model, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawSuggestion {
    #[serde(default, alias = "type", deserialize_with = "lenient_opt_string")]
    pub category: Option<String>,
    #[serde(
        default,
        alias = "startIndex",
        alias = "start_index",
        alias = "start",
        deserialize_with = "lenient_usize"
    )]
    pub offset: usize,
    #[serde(default, deserialize_with = "lenient_opt_usize")]
    pub length: Option<usize>,
    #[serde(
        default,
        alias = "endIndex",
        alias = "end",
        deserialize_with = "lenient_opt_usize"
    )]
    pub end_index: Option<usize>,
    #[serde(
        default,
        alias = "originalText",
        alias = "original_text",
        deserialize_with = "lenient_string"
    )]
    pub original: String,
    #[serde(
        default,
        alias = "replacementText",
        alias = "replacement_text",
        alias = "correction",
        alias = "suggestion",
        deserialize_with = "lenient_string"
    )]
    pub replacement: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub explanation: String,
}

impl RawSuggestion {
    /// Span length, derived from `end_index` when no explicit length was given.
    pub fn span_length(&self) -> usize {
        match (self.length, self.end_index) {
            (Some(length), _) => length,
            (None, Some(end)) => end.saturating_sub(self.offset),
            (None, None) => 0,
        }
    }
}

/// Tone report as returned by a model.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawTone {
    #[serde(
        default,
        alias = "empathyScore",
        alias = "empathy_score",
        deserialize_with = "lenient_f64"
    )]
    pub score: f64,
    #[serde(default, alias = "tone", deserialize_with = "lenient_string")]
    pub label: String,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// Parse a session response into raw suggestions.
///
/// Items that are not objects are skipped. A response with no recognizable
/// JSON payload is an error.
pub fn parse_suggestions(response: &str) -> BackendResult<Vec<RawSuggestion>> {
    let value = extract_json_value(response)?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let list = map
                .remove("suggestions")
                .or_else(|| map.remove("corrections"));
            match list {
                Some(Value::Array(items)) => items,
                Some(Value::Null) => Vec::new(),
                _ => {
                    return Err(BackendError::JsonExtraction {
                        response: response.to_string(),
                    })
                }
            }
        }
        _ => {
            return Err(BackendError::JsonExtraction {
                response: response.to_string(),
            })
        }
    };

    let mut suggestions = Vec::with_capacity(items.len());
    for item in items {
        if !item.is_object() {
            tracing::debug!("Skipping non-object suggestion item: {}", item);
            continue;
        }
        match serde_json::from_value::<RawSuggestion>(item) {
            Ok(raw) => suggestions.push(raw),
            Err(e) => tracing::debug!("Skipping malformed suggestion item: {}", e),
        }
    }
    Ok(suggestions)
}

/// Parse a session response into a tone report.
pub fn parse_tone(response: &str) -> BackendResult<RawTone> {
    let value = extract_json_value(response)?;
    if !value.is_object() {
        return Err(BackendError::JsonExtraction {
            response: response.to_string(),
        });
    }
    serde_json::from_value(value).map_err(BackendError::JsonParse)
}

/// Locate a JSON value in a response (direct, code block, or embedded).
fn extract_json_value(response: &str) -> BackendResult<Value> {
    let trimmed = response.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    // Code blocks first so fenced JSON with prose around it still parses
    if let Some(inner) = extract_from_code_block(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(inner.trim()) {
            return Ok(value);
        }
    }

    for (open, close) in [('[', ']'), ('{', '}')] {
        if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close)) {
            if start < end {
                if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                    return Ok(value);
                }
            }
        }
    }

    Err(BackendError::JsonExtraction {
        response: response.to_string(),
    })
}

/// Extract the body of the first markdown code block.
fn extract_from_code_block(text: &str) -> Option<&str> {
    let patterns = ["```json\n", "```json\r\n", "```\n", "```\r\n"];

    for pattern in patterns {
        if let Some(start) = text.find(pattern) {
            let body_start = start + pattern.len();
            if let Some(end) = text[body_start..].find("```") {
                return Some(&text[body_start..body_start + end]);
            }
        }
    }
    None
}

fn value_to_usize(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Some(u as usize)
            } else if let Some(i) = n.as_i64() {
                Some(i.max(0) as usize)
            } else {
                n.as_f64().map(|f| if f > 0.0 { f as usize } else { 0 })
            }
        }
        Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    }
}

fn lenient_usize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_usize(&value).unwrap_or(0))
}

fn lenient_opt_usize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_usize(&value))
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(lenient_opt_string(deserializer)?.unwrap_or_default())
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}
