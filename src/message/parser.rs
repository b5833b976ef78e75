//! Parser for line-JSON events emitted by a streaming child process

use serde_json::Value;

use crate::error::Result;
use crate::types::messages::ContentValue;

/// One classified line of child output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// System init event; the child is ready for input
    Ready,
    /// Complete assistant message text
    AssistantFull(String),
    /// Incremental assistant text
    AssistantDelta(String),
    /// Error reported by the child
    Error(String),
    /// Valid JSON with a shape this parser does not handle
    Unrecognized,
}

/// Parse one protocol line into an [`InboundEvent`]
///
/// The discriminator is the top-level `type`, falling back to
/// `message.role`. Assistant content may be a string, a single block or a
/// list of blocks and is collapsed through [`ContentValue`].
///
/// # Errors
/// Returns `OrchestratorError::JsonDecode` if the line is not valid JSON.
/// Callers on the read path skip such lines.
pub fn parse_line(line: &str) -> Result<InboundEvent> {
    let value: Value = serde_json::from_str(line)?;
    Ok(classify(&value))
}

/// Classify an already decoded JSON value
#[must_use]
pub fn classify(value: &Value) -> InboundEvent {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .or_else(|| value.pointer("/message/role").and_then(Value::as_str));

    match kind {
        Some("system") if value.get("subtype").and_then(Value::as_str) == Some("init") => {
            InboundEvent::Ready
        }
        Some("assistant" | "assistant_message") => {
            let content = value
                .pointer("/message/content")
                .filter(|c| !is_empty(c))
                .or_else(|| value.get("content"));
            InboundEvent::AssistantFull(content.map(content_text).unwrap_or_default())
        }
        Some("assistant_delta") => {
            let delta = value
                .get("delta")
                .or_else(|| value.pointer("/message/delta"))
                .or_else(|| value.get("content"));
            InboundEvent::AssistantDelta(delta.map(delta_text).unwrap_or_default())
        }
        Some("error") => InboundEvent::Error(error_text(value)),
        _ => InboundEvent::Unrecognized,
    }
}

/// Collapse a content value (string, block or block list) into text
#[must_use]
pub fn content_text(content: &Value) -> String {
    serde_json::from_value::<ContentValue>(content.clone())
        .map(ContentValue::into_text)
        .unwrap_or_default()
}

fn delta_text(delta: &Value) -> String {
    match delta {
        Value::Object(fields) => fields
            .get("content")
            .or_else(|| fields.get("text"))
            .map(content_text)
            .unwrap_or_default(),
        other => content_text(other),
    }
}

fn error_text(value: &Value) -> String {
    match value.get("error") {
        Some(Value::String(message)) => message.clone(),
        Some(error @ Value::Object(fields)) => fields
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| error.to_string(), str::to_string),
        Some(Value::Null) | None => value.to_string(),
        Some(other) => other.to_string(),
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
