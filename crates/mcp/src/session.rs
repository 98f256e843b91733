//! A client-side MCP session over one transport.
//!
//! Requests are issued one at a time; frames that are not the response to
//! the pending request (server notifications, server-initiated requests,
//! stale responses) are logged and skipped.

use crate::protocol::{
    CallToolParams, IncomingMessage, InitializeParams, JsonRpcNotification, JsonRpcRequest,
    ListToolsResult,
};
use crate::transport::McpTransport;
use blinker_core::error::McpError;
use blinker_core::mcp::McpToolDescriptor;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, trace};

/// Upper bound on `tools/list` pages, in case a server keeps handing out cursors.
const MAX_LIST_PAGES: usize = 64;

pub struct McpSession {
    transport: Box<dyn McpTransport>,
    next_id: i64,
    timeout: Duration,
}

impl McpSession {
    pub fn new(transport: Box<dyn McpTransport>, timeout: Duration) -> Self {
        Self {
            transport,
            next_id: 1,
            timeout,
        }
    }

    /// `initialize` handshake followed by `notifications/initialized`.
    pub async fn initialize(&mut self) -> Result<Value, McpError> {
        let params = serde_json::to_value(InitializeParams::default())
            .map_err(|e| McpError::Malformed(e.to_string()))?;
        let result = self.request("initialize", Some(params)).await?;
        self.notify("notifications/initialized", None).await?;
        let server = result
            .pointer("/serverInfo/name")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        debug!(server, "MCP session initialized");
        Ok(result)
    }

    /// Every tool the server offers, following `nextCursor` pagination.
    pub async fn list_tools(&mut self) -> Result<Vec<McpToolDescriptor>, McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let params = match &cursor {
                Some(c) => json!({ "cursor": c }),
                None => json!({}),
            };
            let result = self.request("tools/list", Some(params)).await?;
            let page: ListToolsResult = serde_json::from_value(result)
                .map_err(|e| McpError::Malformed(format!("tools/list result: {e}")))?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(tools),
            }
        }

        Err(McpError::Malformed(format!(
            "tools/list did not finish within {MAX_LIST_PAGES} pages"
        )))
    }

    /// Raw `tools/call` result.
    pub async fn call_tool(&mut self, name: &str, arguments: &Value) -> Result<Value, McpError> {
        let params = serde_json::to_value(CallToolParams { name, arguments })
            .map_err(|e| McpError::Malformed(e.to_string()))?;
        self.request("tools/call", Some(params)).await
    }

    pub async fn close(mut self) -> Result<(), McpError> {
        self.transport.close().await
    }

    async fn notify(&mut self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        let frame = serde_json::to_string(&JsonRpcNotification::new(method, params))
            .map_err(|e| McpError::Malformed(e.to_string()))?;
        self.transport.send(frame).await
    }

    async fn request(&mut self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        let id = self.next_id;
        self.next_id += 1;

        let frame = serde_json::to_string(&JsonRpcRequest::new(id, method, params))
            .map_err(|e| McpError::Malformed(e.to_string()))?;
        trace!(id, method, "MCP request");
        self.transport.send(frame).await?;

        match tokio::time::timeout(self.timeout, self.await_response(id)).await {
            Ok(result) => result,
            Err(_) => Err(McpError::Timeout(self.timeout.as_secs())),
        }
    }

    async fn await_response(&mut self, id: i64) -> Result<Value, McpError> {
        loop {
            let Some(frame) = self.transport.recv().await? else {
                return Err(McpError::ConnectionClosed);
            };

            let message: IncomingMessage = match serde_json::from_str(&frame) {
                Ok(m) => m,
                Err(e) => {
                    debug!("Skipping unparsable MCP frame: {e}");
                    continue;
                }
            };

            if message.answers(id) {
                return message.into_result();
            }
            trace!(method = ?message.method, "Skipping unrelated MCP frame");
        }
    }
}
