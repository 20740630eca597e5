//! Keyword list normalization for the planner's `external_keywords` output.
//!
//! Models return keyword lists in many shapes: real JSON arrays, Python-style
//! reprs with single quotes, bare comma lists or a single word.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    static ref QUOTED: Regex = Regex::new(r#"['"]([^'"]+)['"]"#).expect("quoted pattern");
}

/// Normalize a keyword value into a list of strings.
///
/// `None` means the value looked like a list but nothing could be read from
/// it; callers fall back to their default keywords.
pub fn normalize_keywords(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(items.iter().map(item_text).collect()),
        Value::String(text) => normalize_text(text),
        Value::Null => Some(Vec::new()),
        Value::Bool(_) | Value::Number(_) => Some(vec![value.to_string()]),
        Value::Object(_) => None,
    }
}

/// True for null, blank strings, and empty arrays/objects
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn item_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn normalize_text(text: &str) -> Option<Vec<String>> {
    let text = text.trim();
    if text.is_empty() {
        return Some(Vec::new());
    }

    if let Ok(items) = serde_json::from_str::<Vec<Value>>(text) {
        return Some(items.iter().map(item_text).collect());
    }

    let quoted: Vec<String> = QUOTED
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    if !quoted.is_empty() {
        return Some(quoted);
    }

    if text.starts_with('[') && text.ends_with(']') {
        let inner = &text[1..text.len() - 1];
        let items: Vec<String> = inner
            .split(',')
            .map(|k| k.trim().trim_matches(|c| c == '\'' || c == '"').trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        return if items.is_empty() { None } else { Some(items) };
    }

    Some(vec![text.to_string()])
}
