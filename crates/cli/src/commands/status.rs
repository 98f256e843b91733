//! `blinker status`: Show the effective configuration.

use super::load_config;
use blinker_config::{AppConfig, StoreBackend};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;

    println!("Blinker Status");
    println!("==============");
    println!("  Config dir:     {}", AppConfig::config_dir().display());
    println!("  Model:          {}", config.agent.model);
    println!("  Temperature:    {}", config.agent.temperature);
    println!(
        "  Max tokens:     {}",
        config
            .agent
            .max_tokens
            .map_or_else(|| "provider default".to_string(), |n| n.to_string())
    );
    println!("  Max iterations: {}", config.agent.max_iterations);
    match config.store.backend {
        StoreBackend::Sqlite => println!("  Store:          sqlite ({})", config.store.resolved_path().display()),
        StoreBackend::Memory => println!("  Store:          memory"),
    }
    println!("  Sandbox:        {:?}", config.sandbox.kind);
    println!("  MCP gateway:    {}", config.mcp.base_url);
    println!(
        "  MCP API key:    {}",
        if config.mcp.api_key.is_some() { "set" } else { "not set" }
    );
    println!("  MCP servers:    {}", config.mcp.servers.len());
    for server in &config.mcp.servers {
        let tools = if server.enabled_tools.is_empty() {
            "all tools".to_string()
        } else {
            server.enabled_tools.join(", ")
        };
        println!("    - {} ({}): {tools}", server.qualified_name, server.display_name);
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file; run `blinker init` first");
    }

    Ok(())
}
