//! Thread and message domain types.
//!
//! A thread is the persisted conversation log an agent run works against.
//! Most entries are conversational (user/assistant/tool/system); two types
//! are ephemeral and exist only to carry one-shot context into the next
//! model call (`browser_state`, `image_context`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub String);

impl ThreadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ThreadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The type of a thread entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    User,
    Assistant,
    Tool,
    System,
    /// Snapshot of the sandbox browser, consumed once by the next iteration.
    BrowserState,
    /// An image the agent asked to look at, consumed once by the next iteration.
    ImageContext,
}

impl MessageType {
    /// Types that make up the actual conversation turn order.
    pub const CONVERSATIONAL: [MessageType; 3] =
        [MessageType::Assistant, MessageType::Tool, MessageType::User];

    /// Whether entries of this type are deleted after one use.
    pub fn is_ephemeral(self) -> bool {
        matches!(self, MessageType::BrowserState | MessageType::ImageContext)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::User => "user",
            MessageType::Assistant => "assistant",
            MessageType::Tool => "tool",
            MessageType::System => "system",
            MessageType::BrowserState => "browser_state",
            MessageType::ImageContext => "image_context",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(MessageType::User),
            "assistant" => Some(MessageType::Assistant),
            "tool" => Some(MessageType::Tool),
            "system" => Some(MessageType::System),
            "browser_state" => Some(MessageType::BrowserState),
            "image_context" => Some(MessageType::ImageContext),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry in a thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMessage {
    /// Unique message ID
    pub id: String,

    /// The thread this entry belongs to
    pub thread_id: ThreadId,

    /// What kind of entry this is
    #[serde(rename = "type")]
    pub kind: MessageType,

    /// Plain text or JSON text, depending on `kind`
    pub content: String,

    /// Creation time; "latest" always means the greatest `created_at`
    pub created_at: DateTime<Utc>,
}

impl ThreadMessage {
    pub fn new(thread_id: &ThreadId, kind: MessageType, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            thread_id: thread_id.clone(),
            kind,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(thread_id: &ThreadId, content: impl Into<String>) -> Self {
        Self::new(thread_id, MessageType::User, content)
    }

    pub fn assistant(thread_id: &ThreadId, content: impl Into<String>) -> Self {
        Self::new(thread_id, MessageType::Assistant, content)
    }

    /// A `browser_state` entry carrying the given JSON state object.
    pub fn browser_state(thread_id: &ThreadId, state: &serde_json::Value) -> Self {
        Self::new(thread_id, MessageType::BrowserState, state.to_string())
    }

    /// An `image_context` entry for an image the agent asked to see.
    pub fn image_context(
        thread_id: &ThreadId,
        base64: impl Into<String>,
        mime_type: impl Into<String>,
        file_path: impl Into<String>,
    ) -> Self {
        let payload = serde_json::json!({
            "base64": base64.into(),
            "mime_type": mime_type.into(),
            "file_path": file_path.into(),
        });
        Self::new(thread_id, MessageType::ImageContext, payload.to_string())
    }
}

/// One block of a multimodal message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }

    /// An image block carrying inline base64 data.
    pub fn inline_image(mime_type: &str, base64: &str) -> Self {
        Self::image(format!("data:{mime_type};base64,{base64}"))
    }
}

/// A one-shot user message handed to the model for a single call.
///
/// Never persisted to the thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporaryMessage {
    pub role: String,
    pub content: Vec<ContentBlock>,
}

impl TemporaryMessage {
    pub fn user(content: Vec<ContentBlock>) -> Self {
        Self {
            role: "user".into(),
            content,
        }
    }

    pub fn image_count(&self) -> usize {
        self.content
            .iter()
            .filter(|b| matches!(b, ContentBlock::ImageUrl { .. }))
            .count()
    }
}
