//! Normalization of `tools/call` results into a flat text outcome.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The normalized result handed back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub content: String,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolOutcome {
    /// An outcome describing a failed execution.
    pub fn error(reason: impl std::fmt::Display) -> Self {
        Self {
            content: format!("Error executing tool: {reason}"),
            is_error: true,
        }
    }
}

/// One entry of a `content` list.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    /// `{"type": "text", "text": ...}` or any part carrying a `text` string
    Text(String),
    /// A part wrapping its payload in a `content` field
    Nested(Value),
    /// Image, audio, resource, or anything else
    Other(Value),
}

impl ContentPart {
    fn from_value(value: Value) -> Self {
        if let Some(text) = value.get("text").and_then(Value::as_str) {
            let is_text = match value.get("type").and_then(Value::as_str) {
                Some(kind) => kind == "text",
                None => true,
            };
            if is_text {
                return ContentPart::Text(text.to_string());
            }
        }
        match value {
            Value::String(s) => ContentPart::Text(s),
            Value::Object(mut map) if map.contains_key("content") => {
                ContentPart::Nested(map.remove("content").unwrap_or(Value::Null))
            }
            other => ContentPart::Other(other),
        }
    }

    fn render(&self) -> String {
        match self {
            ContentPart::Text(text) => text.clone(),
            ContentPart::Nested(value) | ContentPart::Other(value) => render_value(value),
        }
    }
}

/// Shapes a `tools/call` result arrives in.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCallResponse {
    /// `{"content": [parts...], "isError": bool}`
    Parts { parts: Vec<ContentPart>, is_error: bool },
    /// `{"content": <non-list>, "isError": bool}`
    Single { content: Value, is_error: bool },
    /// A bare string result
    Bare(String),
    /// Anything without a `content` field
    Raw(Value),
}

impl ToolCallResponse {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) => ToolCallResponse::Bare(s),
            Value::Object(mut map) if map.contains_key("content") => {
                let is_error = map.get("isError").and_then(Value::as_bool).unwrap_or(false);
                match map.remove("content").unwrap_or(Value::Null) {
                    Value::Array(items) => ToolCallResponse::Parts {
                        parts: items.into_iter().map(ContentPart::from_value).collect(),
                        is_error,
                    },
                    content => ToolCallResponse::Single { content, is_error },
                }
            }
            other => ToolCallResponse::Raw(other),
        }
    }

    pub fn into_outcome(self) -> ToolOutcome {
        match self {
            ToolCallResponse::Parts { parts, is_error } => ToolOutcome {
                content: parts.iter().map(ContentPart::render).collect::<Vec<_>>().join("\n"),
                is_error,
            },
            ToolCallResponse::Single { content, is_error } => ToolOutcome {
                content: render_value(&content),
                is_error,
            },
            ToolCallResponse::Bare(text) => ToolOutcome {
                content: text,
                is_error: false,
            },
            ToolCallResponse::Raw(value) => ToolOutcome {
                content: render_value(&value),
                is_error: false,
            },
        }
    }
}

impl From<Value> for ToolOutcome {
    fn from(value: Value) -> Self {
        ToolCallResponse::from_value(value).into_outcome()
    }
}

/// Strings render as-is; everything else as compact JSON.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_parts_join_with_newlines() {
        let outcome = ToolOutcome::from(json!({
            "content": [
                {"type": "text", "text": "line one"},
                {"type": "text", "text": "line two"}
            ]
        }));
        assert_eq!(outcome.content, "line one\nline two");
        assert!(!outcome.is_error);
    }

    #[test]
    fn is_error_is_carried() {
        let outcome = ToolOutcome::from(json!({
            "content": [{"type": "text", "text": "rate limited"}],
            "isError": true
        }));
        assert!(outcome.is_error);
        assert_eq!(outcome.content, "rate limited");
    }

    #[test]
    fn mixed_parts() {
        let response = ToolCallResponse::from_value(json!({
            "content": [
                {"type": "text", "text": "a"},
                {"content": "nested"},
                {"type": "image", "data": "AAA", "mimeType": "image/png"},
            ]
        }));
        let ToolCallResponse::Parts { parts, .. } = &response else {
            panic!("expected parts");
        };
        assert_eq!(parts[0], ContentPart::Text("a".into()));
        assert_eq!(parts[1], ContentPart::Nested(json!("nested")));
        assert!(matches!(parts[2], ContentPart::Other(_)));

        let outcome = response.into_outcome();
        let lines: Vec<_> = outcome.content.lines().collect();
        assert_eq!(lines[0], "a");
        assert_eq!(lines[1], "nested");
        assert!(lines[2].contains("image/png"));
    }

    #[test]
    fn single_and_bare_and_raw() {
        assert_eq!(ToolOutcome::from(json!({"content": "plain"})).content, "plain");
        assert_eq!(ToolOutcome::from(json!({"content": {"k": 1}})).content, r#"{"k":1}"#);
        assert_eq!(ToolOutcome::from(json!("just text")).content, "just text");

        let raw = ToolOutcome::from(json!({"answer": 42}));
        assert_eq!(raw.content, r#"{"answer":42}"#);
        assert!(!raw.is_error);
    }

    #[test]
    fn error_outcome_wire_shape() {
        let outcome = ToolOutcome::error("boom");
        let v = serde_json::to_value(&outcome).unwrap();
        assert_eq!(v, json!({"content": "Error executing tool: boom", "isError": true}));
    }
}
