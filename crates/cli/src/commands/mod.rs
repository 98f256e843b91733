pub mod init;
pub mod mcp;
pub mod sandbox;
pub mod status;
pub mod thread;

use blinker_config::AppConfig;

pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}
