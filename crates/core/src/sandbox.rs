//! Sandbox trait: the isolated environment the agent's commands run in.
//!
//! Backends are picked by explicit configuration at construction time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::SandboxError;

/// Exit code and combined stdout/stderr of a sandbox command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub output: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Backend name (e.g., "local", "docker").
    fn name(&self) -> &str;

    /// Make the sandbox ready to run commands.
    async fn start(&self) -> Result<(), SandboxError>;

    /// Stop the sandbox. Stopping an already-stopped sandbox is not an error.
    async fn stop(&self) -> Result<(), SandboxError>;

    /// Run a shell command inside the sandbox.
    async fn execute_command(&self, command: &str) -> Result<CommandOutput, SandboxError>;

    /// Raw bytes of a file, relative to the sandbox working directory.
    async fn read_file(&self, path: &str) -> Result<Vec<u8>, SandboxError>;

    /// A URL reaching `port` inside the sandbox.
    async fn preview_link(&self, port: u16) -> Result<String, SandboxError>;
}
