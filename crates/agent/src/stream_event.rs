//! Events emitted by an agent run.
//!
//! Provider chunks are forwarded unchanged. The loop adds its own `status`
//! events when a run ends for a reason the consumer must see (billing stop,
//! collaborator failure).

use blinker_core::provider::StreamChunk;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The run was stopped by policy (e.g. billing)
    Stopped,
    /// The run failed
    Error,
}

/// `{"type": "status", "status": ..., "message": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    #[serde(rename = "type")]
    kind: StatusTag,
    pub status: RunStatus,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum StatusTag {
    Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgentEvent {
    Status(StatusEvent),
    Chunk(StreamChunk),
}

impl AgentEvent {
    pub fn stopped(message: impl Into<String>) -> Self {
        Self::Status(StatusEvent {
            kind: StatusTag::Status,
            status: RunStatus::Stopped,
            message: message.into(),
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Status(StatusEvent {
            kind: StatusTag::Status,
            status: RunStatus::Error,
            message: message.into(),
        })
    }

    /// The wire `type` of this event.
    pub fn event_type(&self) -> &str {
        match self {
            Self::Status(_) => "status",
            Self::Chunk(chunk) => &chunk.kind,
        }
    }

    pub fn status(&self) -> Option<RunStatus> {
        match self {
            Self::Status(s) => Some(s.status),
            Self::Chunk(_) => None,
        }
    }
}

impl From<StreamChunk> for AgentEvent {
    fn from(chunk: StreamChunk) -> Self {
        Self::Chunk(chunk)
    }
}
