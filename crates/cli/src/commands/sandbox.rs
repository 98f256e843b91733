//! `blinker sandbox`: Run commands in the configured sandbox.

use super::load_config;
use blinker_tools::build_sandbox;
use tracing::debug;

pub async fn exec(command: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let sandbox = build_sandbox(&config.sandbox);
    debug!(sandbox = sandbox.name(), command, "Running sandbox command");

    let output = sandbox.execute_command(command).await?;
    if !output.output.is_empty() {
        println!("{}", output.output);
    }
    if !output.success() {
        return Err(format!("Command exited with code {}", output.exit_code).into());
    }
    Ok(())
}

pub async fn link(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let sandbox = build_sandbox(&config.sandbox);
    println!("{}", sandbox.preview_link(port).await?);
    Ok(())
}
