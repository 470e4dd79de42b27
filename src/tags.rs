//! Conversion between the JSON string stored in the `tags` column and the tag list
//! used everywhere else.

use std::collections::HashSet;

use serde_json::Value;

/// Decodes a stored tag string. Never fails: anything that is not a JSON array of
/// strings decodes to an empty list.
pub fn decode(raw: Option<&str>) -> Vec<String> {
    let raw = match raw {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return Vec::new(),
    };
    let values = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(values)) => values,
        Ok(_) => return Vec::new(),
        Err(e) => {
            tracing::debug!("ignoring malformed tag json {:?}: {}", raw, e);
            return Vec::new();
        }
    };
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter_map(|value| match value {
            Value::String(tag) if !tag.is_empty() => Some(tag),
            _ => None,
        })
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

/// Encodes tags in order, as given. Duplicates are kept; callers dedupe on entry.
pub fn encode(tags: &[String]) -> String {
    // Serializing a slice of strings cannot fail
    serde_json::to_string(tags).unwrap_or_else(|_| String::from("[]"))
}

/// Splits comma separated form input into tags.
pub fn parse_input(input: &str) -> Vec<String> {
    dedupe(
        input
            .split(|c| c == ',' || c == '，')
            .map(|part| part.to_string())
            .collect(),
    )
}

pub fn dedupe(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}
