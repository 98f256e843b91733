//! # Blinker Core
//!
//! Domain types, traits, and error definitions for the Blinker agent runtime.
//! This crate defines the domain model that all other crates implement
//! against: threads and their messages, the model-invocation provider, tools,
//! MCP server descriptors, sandboxes, and billing.
//!
//! Every collaborator the agent loop talks to is a trait here. Implementations
//! live in their respective crates, which keeps the loop testable with stub
//! implementations and keeps the dependency graph pointing inward.

pub mod agent;
pub mod billing;
pub mod error;
pub mod mcp;
pub mod message;
pub mod provider;
pub mod sandbox;
pub mod thread;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentConfig, AgentRunState, TerminalAction};
pub use billing::{BillingGate, BillingStatus};
pub use error::{Error, Result};
pub use mcp::{McpServerConfig, McpToolDescriptor};
pub use message::{ContentBlock, MessageType, TemporaryMessage, ThreadId, ThreadMessage};
pub use provider::{ChunkStream, Provider, ProviderRequest, StreamChunk};
pub use sandbox::{CommandOutput, Sandbox};
pub use thread::ThreadStore;
pub use tool::{Tool, ToolCall, ToolDefinition, ToolRegistry, ToolResult};
