//! Boundary normalization of agent replies
//!
//! The upstream agent sometimes answers with its whole structured reply
//! serialized into the `message` string, either inside a fenced code block or
//! as a bare JSON object. Mode detection only works on the promoted fields, so
//! every chat/quiz reply passes through here before the state machine sees it.

use super::{AgentReply, GatewayError};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Fields of an embedded payload that override the top-level ones
const PROMOTED_FIELDS: [&str; 3] = ["message", "status", "quiz_info"];

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*\})\s*```").expect("fenced JSON pattern is valid")
});

/// Decode a raw reply body into an [`AgentReply`], promoting any embedded payload.
pub fn normalize_reply(mut raw: Value) -> Result<AgentReply, GatewayError> {
    let embedded = raw
        .get("message")
        .and_then(Value::as_str)
        .and_then(extract_embedded);

    if let (Some(embedded), Some(target)) = (embedded, raw.as_object_mut()) {
        tracing::debug!(
            fields = ?embedded.keys().collect::<Vec<_>>(),
            "Promoting JSON embedded in reply message"
        );
        promote(target, embedded);
    }

    serde_json::from_value(raw).map_err(|e| GatewayError::decode(format!("Malformed reply: {e}")))
}

/// Find a JSON object carrying reply fields inside a message string.
fn extract_embedded(text: &str) -> Option<Map<String, Value>> {
    let trimmed = text.trim();
    let candidate = if let Some(caps) = FENCED_JSON.captures(trimmed) {
        caps.get(1)?.as_str()
    } else if trimmed.starts_with('{') && trimmed.ends_with('}') {
        trimmed
    } else {
        return None;
    };

    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) if PROMOTED_FIELDS.iter().any(|f| map.contains_key(*f)) => Some(map),
        _ => None,
    }
}

fn promote(target: &mut Map<String, Value>, mut embedded: Map<String, Value>) {
    // The raw string is never a useful message once it has been unpacked
    let message = embedded
        .remove("message")
        .unwrap_or_else(|| Value::String(String::new()));
    target.insert("message".to_string(), message);

    for field in &PROMOTED_FIELDS[1..] {
        if let Some(value) = embedded.remove(*field) {
            target.insert((*field).to_string(), value);
        }
    }
}
