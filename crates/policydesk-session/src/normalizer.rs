//! Turns whatever the chat route returned into display text.
//!
//! Backends answer with a plain string, a structured object from a workflow
//! engine, or nothing at all. None of these may fail the conversation.

use serde_json::{Map, Value};

use policydesk_core::types::Citation;

/// Shown when the payload carries no response at all.
pub const NO_RESPONSE_FALLBACK: &str = "no response received";

/// Keys probed, in order, on structured responses.
const TEXT_KEYS: [&str; 3] = ["text", "output", "answer"];

/// Normalize the raw value found at the payload's `response` field.
pub fn normalize_response(raw: Option<&Value>) -> String {
    match raw {
        None | Some(Value::Null) => NO_RESPONSE_FALLBACK.to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Object(map)) => probe_text(map).unwrap_or_else(|| serialize(raw)),
        Some(other) => other.to_string(),
    }
}

/// Normalize a whole chat payload by reading its `response` field.
pub fn normalize_payload(payload: &Value) -> String {
    normalize_response(payload.get("response"))
}

fn probe_text(map: &Map<String, Value>) -> Option<String> {
    TEXT_KEYS.iter().find_map(|key| match map.get(*key) {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text.clone()),
        Some(other) => Some(other.to_string()),
    })
}

fn serialize(value: Option<&Value>) -> String {
    value
        .map(Value::to_string)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| NO_RESPONSE_FALLBACK.to_string())
}

/// Read an optional `citations` array from a chat payload.
///
/// Looks at the top level first, then inside a structured `response`.
/// Entries without a document name are skipped.
pub fn extract_citations(payload: &Value) -> Vec<Citation> {
    let list = payload
        .get("citations")
        .or_else(|| payload.get("response").and_then(|r| r.get("citations")))
        .and_then(Value::as_array);

    let Some(list) = list else {
        return Vec::new();
    };

    list.iter().filter_map(citation_from).collect()
}

fn citation_from(entry: &Value) -> Option<Citation> {
    let obj = entry.as_object()?;
    let document_name = obj
        .get("document_name")
        .or_else(|| obj.get("documentName"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())?
        .to_string();

    let page = obj.get("page").and_then(|p| match p {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    });

    let snippet = obj
        .get("snippet")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Some(Citation {
        document_name,
        page,
        snippet,
    })
}
