//! Detection of terminal actions in streamed assistant output.
//!
//! The model ends its turn by closing one of the terminal tags
//! (`</ask>`, `</complete>`, `</web-browser-takeover>`). Chunks arrive as
//! fragments, so the tail of the previous fragment is kept and scanned
//! together with the next one.

use blinker_core::agent::TerminalAction;
use blinker_core::provider::StreamChunk;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Longest closing tag, in bytes (all tags are ASCII).
fn max_tag_len() -> usize {
    TerminalAction::ALL
        .iter()
        .map(|a| a.closing_tag().len())
        .max()
        .unwrap_or(0)
}

#[derive(Debug, Default)]
pub struct StopConditionDetector {
    carry: String,
}

impl StopConditionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect one chunk. Non-assistant chunks are ignored.
    pub fn observe(&mut self, chunk: &StreamChunk) -> Option<TerminalAction> {
        if !chunk.is_assistant() {
            return None;
        }

        match assistant_text(&chunk.content) {
            Ok(Some(text)) => self.scan(&text),
            Ok(None) => None,
            Err(e) => {
                warn!("Could not parse assistant content JSON: {e}");
                None
            }
        }
    }

    /// Scan a fragment of assistant text, returning the highest-priority
    /// action whose closing tag completes in it.
    pub fn scan(&mut self, text: &str) -> Option<TerminalAction> {
        let carry_len = self.carry.len();
        let window = format!("{}{}", self.carry, text);

        let found = TerminalAction::ALL.into_iter().find(|action| {
            let tag = action.closing_tag();
            window
                .match_indices(tag)
                .any(|(at, _)| at + tag.len() > carry_len)
        });

        self.carry = tail(&window, max_tag_len().saturating_sub(1)).to_string();

        if let Some(action) = found {
            info!(action = %action, "Agent used terminal tool");
        }
        found
    }

    pub fn reset(&mut self) {
        self.carry.clear();
    }
}

/// The text inside an assistant chunk: `content` is either a JSON string
/// encoding `{"content": text, ...}` or that object itself.
fn assistant_text(content: &Value) -> Result<Option<String>, serde_json::Error> {
    let parsed;
    let object = match content {
        Value::String(raw) => {
            parsed = serde_json::from_str::<Value>(raw)?;
            &parsed
        }
        other => other,
    };

    match object.get("content") {
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(other) => {
            debug!("Assistant content is not a string: {other}");
            Ok(None)
        }
        None => Ok(None),
    }
}

/// At most the last `n` bytes of `s`, cut on a char boundary.
fn tail(s: &str, n: usize) -> &str {
    let mut start = s.len().saturating_sub(n);
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}
