//! MCP server configuration and tool descriptor types.
//!
//! These are shared between the config loader (which reads server entries
//! from TOML) and the MCP manager (which connects to them).

use serde::{Deserialize, Deserializer, Serialize};

/// One external MCP server the agent may route tool calls to.
///
/// Field names follow the registry wire format (`qualifiedName`,
/// `enabledTools`); snake_case aliases are accepted in TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Unique provider identifier, e.g. `exa` or `@smithery-ai/github`
    #[serde(rename = "qualifiedName", alias = "qualified_name")]
    pub qualified_name: String,

    /// Human-readable name
    #[serde(rename = "name")]
    pub display_name: String,

    /// Provider-specific configuration, sent base64-encoded in the access URL
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,

    /// Allow-list of tool names. Empty means every tool is enabled.
    #[serde(
        rename = "enabledTools",
        alias = "enabled_tools",
        default,
        deserialize_with = "null_as_empty"
    )]
    pub enabled_tools: Vec<String>,
}

impl McpServerConfig {
    pub fn new(qualified_name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            display_name: display_name.into(),
            config: serde_json::Map::new(),
            enabled_tools: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: serde_json::Map<String, serde_json::Value>) -> Self {
        self.config = config;
        self
    }

    pub fn with_enabled_tools(mut self, tools: Vec<String>) -> Self {
        self.enabled_tools = tools;
        self
    }

    /// Whether a tool passes the allow-list.
    pub fn is_tool_enabled(&self, tool_name: &str) -> bool {
        self.enabled_tools.is_empty() || self.enabled_tools.iter().any(|t| t == tool_name)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A capability reported by an MCP server's `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolDescriptor {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON Schema for the arguments. Kept raw: servers send all sorts.
    #[serde(rename = "inputSchema", default)]
    pub input_schema: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_wire_names() {
        let json = r#"{
            "qualifiedName": "exa",
            "name": "Exa Search",
            "config": {"exaApiKey": "k"},
            "enabledTools": null
        }"#;
        let cfg: McpServerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.qualified_name, "exa");
        assert_eq!(cfg.display_name, "Exa Search");
        assert!(cfg.enabled_tools.is_empty());
        assert!(cfg.is_tool_enabled("anything"));
    }

    #[test]
    fn allow_list_filters() {
        let cfg = McpServerConfig::new("exa", "Exa").with_enabled_tools(vec!["search".into()]);
        assert!(cfg.is_tool_enabled("search"));
        assert!(!cfg.is_tool_enabled("crawl"));
    }

    #[test]
    fn descriptor_tolerates_missing_schema() {
        let tool: McpToolDescriptor = serde_json::from_str(r#"{"name": "ping"}"#).unwrap();
        assert!(tool.input_schema.is_null());
        assert!(tool.description.is_none());
    }
}
