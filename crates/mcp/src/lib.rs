//! # Blinker MCP
//!
//! Routing and connection layer for tools hosted on remote MCP servers.
//!
//! Tools are exposed to the model under namespaced ids of the form
//! `mcp_{qualifiedName}_{toolName}`. The [`McpManager`] discovers and caches
//! each server's tool list, projects the enabled tools into model-facing
//! definitions, and dispatches calls over a fresh JSON-RPC session per call.

pub mod executor;
pub mod manager;
pub mod naming;
pub mod protocol;
pub mod result;
pub mod schema;
pub mod session;
pub mod transport;

pub use executor::{McpToolExecutor, RoutedTool, register_routed_tools};
pub use manager::{McpConnection, McpManager, McpSettings, McpToolInfo};
pub use naming::{RoutedToolName, decode_tool_name, encode_tool_name};
pub use result::{ToolCallResponse, ToolOutcome};
pub use schema::project_tool;
pub use session::McpSession;
pub use transport::{Connector, McpTransport, WebSocketConnector};
