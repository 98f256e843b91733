//! Namespaced tool ids: `mcp_{qualifiedName}_{toolName}`.
//!
//! Decoding splits on the first two underscores only, so the tool name may
//! itself contain underscores while the qualified name may not.

use blinker_core::error::McpError;

pub const TOOL_PREFIX: &str = "mcp";

/// A decoded tool id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedToolName {
    pub qualified_name: String,
    pub tool_name: String,
}

impl RoutedToolName {
    pub fn encode(&self) -> String {
        encode_tool_name(&self.qualified_name, &self.tool_name)
    }
}

pub fn encode_tool_name(qualified_name: &str, tool_name: &str) -> String {
    format!("{TOOL_PREFIX}_{qualified_name}_{tool_name}")
}

pub fn decode_tool_name(tool_id: &str) -> Result<RoutedToolName, McpError> {
    let mut parts = tool_id.splitn(3, '_');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(TOOL_PREFIX), Some(qualified), Some(tool))
            if !qualified.is_empty() && !tool.is_empty() =>
        {
            Ok(RoutedToolName {
                qualified_name: qualified.to_string(),
                tool_name: tool.to_string(),
            })
        }
        _ => Err(McpError::InvalidToolName(tool_id.to_string())),
    }
}
