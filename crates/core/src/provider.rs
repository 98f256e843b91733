//! Provider trait: the abstraction over the model-invocation layer.
//!
//! A Provider takes a thread (by ID), an optional one-shot message and the
//! tools the model may call, runs one model turn against it and hands back a
//! lazy stream of output chunks. Persisting the turn's messages and executing
//! tool calls mid-stream are the provider's business; the agent loop only
//! consumes the chunks.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use crate::error::ProviderError;
use crate::message::{TemporaryMessage, ThreadId};
use crate::tool::ToolRegistry;

/// A request for one model turn.
#[derive(Clone)]
pub struct ProviderRequest {
    /// The thread to run
    pub thread_id: ThreadId,

    /// The model to use (e.g., "anthropic/claude-sonnet-4")
    pub model: String,

    /// Temperature (0.0 = deterministic)
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,

    /// One-shot context for this call only
    pub temporary_message: Option<TemporaryMessage>,

    /// Tools the model may call during this turn
    pub tools: Arc<ToolRegistry>,
}

impl std::fmt::Debug for ProviderRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRequest")
            .field("thread_id", &self.thread_id)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("temporary_message", &self.temporary_message.is_some())
            .field("tools", &self.tools.len())
            .finish()
    }
}

/// A single chunk of streamed model output.
///
/// `type` is the declared role of the chunk ("assistant", "tool", "status",
/// ...). `content` is either a JSON-encoded string or an already-structured
/// value, depending on the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub content: serde_json::Value,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl StreamChunk {
    pub fn new(kind: impl Into<String>, content: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            content,
            metadata: serde_json::Map::new(),
        }
    }

    /// An assistant chunk in the usual `{"role": "assistant", "content": text}`
    /// shape, JSON-encoded into a string.
    pub fn assistant_text(text: impl Into<String>) -> Self {
        let payload = serde_json::json!({ "role": "assistant", "content": text.into() });
        Self::new("assistant", serde_json::Value::String(payload.to_string()))
    }

    pub fn is_assistant(&self) -> bool {
        self.kind == "assistant"
    }
}

/// The lazy chunk sequence produced by one model turn.
pub type ChunkStream = BoxStream<'static, StreamChunk>;

/// The core Provider trait.
///
/// An `Err` is the provider's explicit error status: the agent loop forwards
/// it once and ends the run. Retries, if any, belong inside the provider.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider.
    fn name(&self) -> &str;

    /// Run one model turn against the thread.
    async fn run_thread(&self, request: ProviderRequest) -> Result<ChunkStream, ProviderError>;
}
