//! `blinker init`: Create the config directory and a default config.

use blinker_config::AppConfig;

pub async fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");
    let workspace_dir = config_dir.join("workspace");

    println!("Blinker setup");
    println!("=============\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if !workspace_dir.exists() {
        std::fs::create_dir_all(&workspace_dir)?;
        println!("  Created sandbox workspace: {}", workspace_dir.display());
    }

    if config_path.exists() && !force {
        println!("\n  Config already exists at: {}", config_path.display());
        println!("  Edit it manually or re-run with --force.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("  Wrote config.toml at: {}", config_path.display());
    println!("\n  Next steps:");
    println!("    1. Set SMITHERY_API_KEY or mcp.api_key");
    println!("    2. Add [[mcp.servers]] entries for the tool servers you use");
    println!("    3. Run: blinker mcp tools\n");

    Ok(())
}
