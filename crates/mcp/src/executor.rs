//! Tool-registry adapters for MCP tools.
//!
//! Two ways to expose MCP tools to the model:
//! - [`McpToolExecutor`]: one generic tool taking `{tool_name, arguments}`
//! - [`RoutedTool`]: one registry entry per projected tool, named by its id

use crate::manager::McpManager;
use async_trait::async_trait;
use blinker_core::error::ToolError;
use blinker_core::tool::{Tool, ToolDefinition, ToolRegistry, ToolResult};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, info};

async fn run_routed(manager: &McpManager, tool_id: &str, arguments: Value) -> ToolResult {
    match manager.execute_tool(tool_id, arguments).await {
        Ok(outcome) => {
            let data = serde_json::to_value(&outcome).unwrap_or(Value::Null);
            let result = if outcome.is_error {
                ToolResult::failed(outcome.content)
            } else {
                ToolResult::ok(outcome.content)
            };
            result.with_data(data)
        }
        Err(e) => {
            error!(tool_id, "MCP tool execution error: {e}");
            ToolResult::failed(e.to_string())
        }
    }
}

/// Executes any routed MCP tool named in its arguments.
pub struct McpToolExecutor {
    manager: Arc<McpManager>,
}

impl McpToolExecutor {
    pub fn new(manager: Arc<McpManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Tool for McpToolExecutor {
    fn name(&self) -> &str {
        "mcp_tool_executor"
    }

    fn description(&self) -> &str {
        "Executes a tool from a connected MCP server."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "tool_name": {
                    "type": "string",
                    "description": "The full name of the tool to execute (e.g., mcp_exa_web_search_exa)."
                },
                "arguments": {
                    "type": "object",
                    "description": "The arguments for the tool."
                }
            },
            "required": ["tool_name", "arguments"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
        let Some(tool_name) = arguments
            .get("tool_name")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
        else {
            return Ok(ToolResult::failed("tool_name is a required argument."));
        };
        let tool_arguments = arguments.get("arguments").cloned().unwrap_or_else(|| json!({}));

        info!(tool_name, "Executing MCP tool via executor");
        Ok(run_routed(&self.manager, tool_name, tool_arguments).await)
    }
}

/// A single projected MCP tool registered under its routed id.
pub struct RoutedTool {
    manager: Arc<McpManager>,
    definition: ToolDefinition,
}

impl RoutedTool {
    pub fn new(manager: Arc<McpManager>, definition: ToolDefinition) -> Self {
        Self { manager, definition }
    }
}

#[async_trait]
impl Tool for RoutedTool {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn description(&self) -> &str {
        &self.definition.description
    }

    fn parameters_schema(&self) -> Value {
        self.definition.parameters.clone()
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
        Ok(run_routed(&self.manager, &self.definition.name, arguments).await)
    }
}

/// Register every enabled tool of every connected server. Returns how many
/// were added.
pub async fn register_routed_tools(manager: &Arc<McpManager>, registry: &mut ToolRegistry) -> usize {
    let definitions = manager.get_all_tools_for_model().await;
    let count = definitions.len();
    for definition in definitions {
        registry.register(Box::new(RoutedTool::new(manager.clone(), definition)));
    }
    count
}
