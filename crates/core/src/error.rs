//! Error types for the Blinker domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Blinker operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Thread store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- MCP errors ---
    #[error("MCP error: {0}")]
    Mcp(#[from] McpError),

    // --- Sandbox errors ---
    #[error("Sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    // --- Billing errors ---
    #[error("Billing error: {0}")]
    Billing(#[from] BillingError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures reported by the model-invocation layer.
///
/// When a provider returns one of these instead of a chunk stream, the agent
/// loop forwards it as a single error status event and ends the run.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("{0}")]
    Status(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

/// Errors raised by the MCP routing and connection layer.
///
/// Format and configuration problems surface to the caller of
/// `connect_server` / `execute_tool`; transport failures during a tool call are
/// folded into a data-level error result instead.
#[derive(Debug, Clone, Error)]
pub enum McpError {
    #[error("Invalid MCP tool name format: {0}")]
    InvalidToolName(String),

    #[error("MCP server {0} not connected")]
    NotConnected(String),

    #[error("MCP API key is not set; configure mcp.api_key or SMITHERY_API_KEY")]
    MissingCredential,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Connection closed by MCP server")]
    ConnectionClosed,

    #[error("MCP protocol error {code}: {message}")]
    Protocol { code: i64, message: String },

    #[error("Malformed MCP message: {0}")]
    Malformed(String),

    #[error("MCP request timed out after {0}s")]
    Timeout(u64),

    #[error("MCP connections were reset while connecting to {0}")]
    Reset(String),
}

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Sandbox not found: {0}")]
    NotFound(String),

    #[error("Sandbox is not running: {0}")]
    NotRunning(String),

    #[error("Sandbox command failed to launch: {0}")]
    Launch(String),

    #[error("Sandbox backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Account lookup failed: {0}")]
    AccountLookup(String),

    #[error("Billing backend unavailable: {0}")]
    Unavailable(String),
}
