//! Sandbox backends and sandbox tools for Blinker.
//!
//! The sandbox is where the agent's commands run. Two backends exist:
//! a local one (host processes in a working directory) and a Docker one
//! (exec into an existing container). The backend is chosen once, from
//! configuration, when the sandbox is built.

pub mod docker;
pub mod local;
pub mod sandbox_tools;

use blinker_config::{AppConfig, SandboxConfig, SandboxKind};
use blinker_core::message::ThreadId;
use blinker_core::sandbox::Sandbox;
use blinker_core::thread::ThreadStore;
use blinker_core::tool::ToolRegistry;
use std::path::PathBuf;
use std::sync::Arc;

pub use docker::DockerSandbox;
pub use local::LocalSandbox;
pub use sandbox_tools::{ExecuteCommandTool, ExposePortTool, SeeImageTool};

/// Build the configured sandbox backend.
pub fn build_sandbox(config: &SandboxConfig) -> Arc<dyn Sandbox> {
    match config.kind {
        SandboxKind::Local => {
            let workdir = config
                .workdir
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_else(|| AppConfig::config_dir().join("workspace"));
            Arc::new(LocalSandbox::new(workdir).with_preview_host(&config.preview_host))
        }
        SandboxKind::Docker => Arc::new(
            DockerSandbox::new(&config.container_name).with_preview_host(&config.preview_host),
        ),
    }
}

/// A registry with every sandbox tool bound to `sandbox`.
///
/// `see_image` writes to `thread_id`, so a registry serves one thread.
pub fn default_registry(
    sandbox: Arc<dyn Sandbox>,
    store: Arc<dyn ThreadStore>,
    thread_id: ThreadId,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ExecuteCommandTool::new(sandbox.clone())));
    registry.register(Box::new(ExposePortTool::new(sandbox.clone())));
    registry.register(Box::new(SeeImageTool::new(sandbox, store, thread_id)));
    registry
}
