//! Projection of MCP tool descriptors into model-facing tool definitions.

use crate::naming::encode_tool_name;
use blinker_core::mcp::{McpServerConfig, McpToolDescriptor};
use blinker_core::tool::ToolDefinition;
use serde_json::{Value, json};

/// Build the definition the model sees for one server tool.
///
/// Only `properties` and `required` survive from the input schema; anything
/// missing or of the wrong shape falls back to an empty object / list.
pub fn project_tool(server: &McpServerConfig, tool: &McpToolDescriptor) -> ToolDefinition {
    let schema = tool.input_schema.as_object();

    let properties = schema
        .and_then(|s| s.get("properties"))
        .filter(|p| p.is_object())
        .cloned()
        .unwrap_or_else(|| json!({}));

    let required = schema
        .and_then(|s| s.get("required"))
        .filter(|r| r.is_array())
        .cloned()
        .unwrap_or_else(|| Value::Array(vec![]));

    let description = match tool.description.as_deref() {
        Some(d) if !d.is_empty() => d.to_string(),
        _ => format!("MCP tool from {}", server.display_name),
    };

    ToolDefinition {
        name: encode_tool_name(&server.qualified_name, &tool.name),
        description,
        parameters: json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }),
    }
}

/// Definitions for every tool of a server that passes its allow-list.
pub fn project_enabled(server: &McpServerConfig, tools: &[McpToolDescriptor]) -> Vec<ToolDefinition> {
    tools
        .iter()
        .filter(|t| server.is_tool_enabled(&t.name))
        .map(|t| project_tool(server, t))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, description: Option<&str>, schema: Value) -> McpToolDescriptor {
        McpToolDescriptor {
            name: name.into(),
            description: description.map(String::from),
            input_schema: schema,
        }
    }

    #[test]
    fn projects_schema_fields() {
        let server = McpServerConfig::new("exa", "Exa Search");
        let tool = descriptor(
            "web_search_exa",
            Some("Search the web"),
            json!({
                "type": "object",
                "properties": {"query": {"type": "string"}},
                "required": ["query"],
                "additionalProperties": false
            }),
        );

        let def = project_tool(&server, &tool);
        assert_eq!(def.name, "mcp_exa_web_search_exa");
        assert_eq!(def.description, "Search the web");
        assert_eq!(def.parameters["type"], "object");
        assert_eq!(def.parameters["properties"]["query"]["type"], "string");
        assert_eq!(def.parameters["required"], json!(["query"]));
        assert!(def.parameters.get("additionalProperties").is_none());
    }

    #[test]
    fn missing_schema_and_description_use_defaults() {
        let server = McpServerConfig::new("exa", "Exa Search");
        let def = project_tool(&server, &descriptor("ping", None, Value::Null));
        assert_eq!(def.description, "MCP tool from Exa Search");
        assert_eq!(def.parameters["properties"], json!({}));
        assert_eq!(def.parameters["required"], json!([]));
    }

    #[test]
    fn malformed_schema_fields_fall_back() {
        let server = McpServerConfig::new("x", "X");
        let tool = descriptor("t", Some(""), json!({"properties": [1, 2], "required": "q"}));
        let def = project_tool(&server, &tool);
        assert_eq!(def.description, "MCP tool from X");
        assert_eq!(def.parameters["properties"], json!({}));
        assert_eq!(def.parameters["required"], json!([]));
    }

    #[test]
    fn allow_list_filters_projection() {
        let server = McpServerConfig::new("exa", "Exa").with_enabled_tools(vec!["b".into()]);
        let tools = vec![
            descriptor("a", None, Value::Null),
            descriptor("b", None, Value::Null),
        ];
        let defs = project_enabled(&server, &tools);
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "mcp_exa_b");
    }
}
