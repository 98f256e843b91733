//! JSON-RPC 2.0 framing and the MCP messages the client uses.

use blinker_core::error::McpError;
use blinker_core::mcp::McpToolDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: i64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: i64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Any inbound frame. Responses carry an `id` and no `method`; server
/// requests and notifications carry a `method`.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

impl IncomingMessage {
    /// Whether this is the response to request `id`.
    pub fn answers(&self, id: i64) -> bool {
        self.method.is_none() && self.id.as_ref().and_then(Value::as_i64) == Some(id)
    }

    pub fn into_result(self) -> Result<Value, McpError> {
        match (self.error, self.result) {
            (Some(error), _) => Err(McpError::Protocol {
                code: error.code,
                message: error.message,
            }),
            (None, Some(result)) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: &'static str,
    pub capabilities: Value,
    pub client_info: ClientInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientInfo {
    pub name: &'static str,
    pub version: &'static str,
}

impl Default for InitializeParams {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            capabilities: serde_json::json!({}),
            client_info: ClientInfo {
                name: "blinker",
                version: env!("CARGO_PKG_VERSION"),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    #[serde(default)]
    pub tools: Vec<McpToolDescriptor>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallToolParams<'a> {
    pub name: &'a str,
    pub arguments: &'a Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_wire_format() {
        let req = JsonRpcRequest::new(7, "tools/list", Some(json!({})));
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v, json!({"jsonrpc": "2.0", "id": 7, "method": "tools/list", "params": {}}));

        let note = JsonRpcNotification::new("notifications/initialized", None);
        let v = serde_json::to_value(&note).unwrap();
        assert!(v.get("id").is_none());
        assert!(v.get("params").is_none());
    }

    #[test]
    fn response_matching() {
        let msg: IncomingMessage =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": 3, "result": {"ok": true}}))
                .unwrap();
        assert!(msg.answers(3));
        assert!(!msg.answers(4));
        assert_eq!(msg.into_result().unwrap(), json!({"ok": true}));

        let note: IncomingMessage = serde_json::from_value(
            json!({"jsonrpc": "2.0", "method": "notifications/progress", "params": {}}),
        )
        .unwrap();
        assert!(!note.answers(3));
    }

    #[test]
    fn error_response_maps_to_protocol_error() {
        let msg: IncomingMessage = serde_json::from_value(json!({
            "jsonrpc": "2.0", "id": 1,
            "error": {"code": -32601, "message": "Method not found"}
        }))
        .unwrap();
        match msg.into_result() {
            Err(McpError::Protocol { code, message }) => {
                assert_eq!(code, -32601);
                assert_eq!(message, "Method not found");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn initialize_params_shape() {
        let v = serde_json::to_value(InitializeParams::default()).unwrap();
        assert_eq!(v["protocolVersion"], "2024-11-05");
        assert_eq!(v["clientInfo"]["name"], "blinker");
    }

    #[test]
    fn list_tools_cursor() {
        let r: ListToolsResult = serde_json::from_value(json!({
            "tools": [{"name": "a"}],
            "nextCursor": "page2"
        }))
        .unwrap();
        assert_eq!(r.tools.len(), 1);
        assert_eq!(r.next_cursor.as_deref(), Some("page2"));
    }
}
