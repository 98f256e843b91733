//! `blinker mcp`: List and call tools on configured MCP servers.

use super::load_config;
use blinker_core::mcp::McpServerConfig;
use blinker_mcp::{McpManager, McpSettings, decode_tool_name, encode_tool_name};
use serde_json::Value;
use tracing::{info, warn};

pub async fn tools() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    if config.mcp.servers.is_empty() {
        println!("No MCP servers configured. Add [[mcp.servers]] entries to config.toml.");
        return Ok(());
    }

    let manager = McpManager::new(McpSettings::from(&config.mcp));
    manager.connect_all(&config.mcp.servers).await;

    let connections = manager.connections().await;
    for server in &config.mcp.servers {
        let Some(conn) = connections
            .iter()
            .find(|c| c.qualified_name() == server.qualified_name)
        else {
            warn!(server = %server.qualified_name, "MCP server did not connect");
            println!("\n{} ({}): not connected", server.display_name, server.qualified_name);
            continue;
        };

        println!("\n{} ({}): {} tools", server.display_name, server.qualified_name, conn.tools.len());
        for tool in &conn.tools {
            let marker = if server.is_tool_enabled(&tool.name) { " " } else { "-" };
            println!(
                "  {marker} {:<40} {}",
                encode_tool_name(&server.qualified_name, &tool.name),
                tool.description.as_deref().unwrap_or("")
            );
        }
    }

    println!("\n({} definitions exposed to the model)", manager.get_all_tools_for_model().await.len());
    manager.disconnect_all().await;
    Ok(())
}

pub async fn call(tool_id: &str, args: &str) -> Result<(), Box<dyn std::error::Error>> {
    let arguments = parse_arguments(args)?;
    let config = load_config()?;
    let server = configured_server(&config.mcp.servers, tool_id)?;

    info!(tool_id, server = %server.qualified_name, "Calling MCP tool");
    let manager = McpManager::new(McpSettings::from(&config.mcp));
    manager.connect_server(server).await?;

    let outcome = manager.execute_tool(tool_id, arguments).await?;
    println!("{}", outcome.content);
    manager.disconnect_all().await;

    if outcome.is_error {
        return Err(format!("Tool {tool_id} reported an error").into());
    }
    Ok(())
}

/// Arguments must be a JSON object.
fn parse_arguments(raw: &str) -> Result<Value, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err("--args must be a JSON object".into()),
        Err(e) => Err(format!("--args is not valid JSON: {e}")),
    }
}

/// The configured server a routed tool id points at.
fn configured_server<'a>(
    servers: &'a [McpServerConfig],
    tool_id: &str,
) -> Result<&'a McpServerConfig, Box<dyn std::error::Error>> {
    let routed = decode_tool_name(tool_id)?;
    servers
        .iter()
        .find(|s| s.qualified_name == routed.qualified_name)
        .ok_or_else(|| format!("MCP server '{}' is not configured", routed.qualified_name).into())
}
