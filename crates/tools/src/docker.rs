//! Docker sandbox: commands run inside an existing container.
//!
//! Talks to Docker through the `docker` CLI. The container itself is created
//! outside Blinker (compose file, setup script); this backend only starts,
//! stops, and execs into it.

use crate::local::run_to_output;
use async_trait::async_trait;
use blinker_core::error::SandboxError;
use blinker_core::sandbox::{CommandOutput, Sandbox};
use tokio::process::Command;
use tracing::{debug, info, warn};

pub struct DockerSandbox {
    container_name: String,
    docker_bin: String,
    preview_host: String,
}

impl DockerSandbox {
    pub fn new(container_name: impl Into<String>) -> Self {
        Self {
            container_name: container_name.into(),
            docker_bin: "docker".into(),
            preview_host: "localhost".into(),
        }
    }

    /// Use a different `docker`-compatible binary (e.g. `podman`).
    pub fn with_binary(mut self, docker_bin: impl Into<String>) -> Self {
        self.docker_bin = docker_bin.into();
        self
    }

    pub fn with_preview_host(mut self, host: impl Into<String>) -> Self {
        self.preview_host = host.into();
        self
    }

    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    async fn docker(&self, args: &[&str]) -> Result<CommandOutput, SandboxError> {
        let mut cmd = Command::new(&self.docker_bin);
        cmd.args(args);
        run_to_output(&mut cmd, &self.docker_bin).await
    }

    async fn is_running(&self) -> Result<bool, SandboxError> {
        let out = self
            .docker(&["inspect", "-f", "{{.State.Running}}", &self.container_name])
            .await?;
        if !out.success() {
            if out.output.contains("No such") {
                return Err(SandboxError::NotFound(self.container_name.clone()));
            }
            return Err(SandboxError::Backend(out.output));
        }
        Ok(out.output.trim() == "true")
    }
}

/// Host port from `docker port` output such as `0.0.0.0:49153\n[::]:49153`.
pub fn parse_host_port(output: &str) -> Option<u16> {
    output
        .lines()
        .filter_map(|line| line.trim().rsplit_once(':'))
        .find_map(|(_, port)| port.parse().ok())
}

#[async_trait]
impl Sandbox for DockerSandbox {
    fn name(&self) -> &str {
        "docker"
    }

    async fn start(&self) -> Result<(), SandboxError> {
        if self.is_running().await? {
            debug!(container = %self.container_name, "Container already running");
            return Ok(());
        }

        info!(container = %self.container_name, "Starting container");
        let out = self.docker(&["start", &self.container_name]).await?;
        if !out.success() {
            return Err(SandboxError::Backend(out.output));
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), SandboxError> {
        match self.docker(&["stop", &self.container_name]).await {
            Ok(out) if out.success() => {
                info!(container = %self.container_name, "Container stopped");
            }
            Ok(out) => warn!(container = %self.container_name, "docker stop: {}", out.output),
            Err(e) => warn!(container = %self.container_name, "docker stop: {e}"),
        }
        Ok(())
    }

    async fn execute_command(&self, command: &str) -> Result<CommandOutput, SandboxError> {
        self.start().await?;
        debug!(container = %self.container_name, command = %command, "Executing in container");
        self.docker(&["exec", &self.container_name, "sh", "-c", command])
            .await
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, SandboxError> {
        self.start().await?;
        debug!(container = %self.container_name, path, "Reading file from container");
        let output = Command::new(&self.docker_bin)
            .args(["exec", &self.container_name, "cat", "--", path])
            .output()
            .await
            .map_err(|e| SandboxError::Launch(format!("{}: {e}", self.docker_bin)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SandboxError::Backend(stderr.trim().to_string()));
        }
        Ok(output.stdout)
    }

    async fn preview_link(&self, port: u16) -> Result<String, SandboxError> {
        let spec = format!("{port}/tcp");
        let mapped = match self.docker(&["port", &self.container_name, &spec]).await {
            Ok(out) if out.success() => parse_host_port(&out.output),
            Ok(out) => {
                debug!("docker port: {}", out.output);
                None
            }
            Err(e) => {
                debug!("docker port: {e}");
                None
            }
        };

        let host_port = mapped.unwrap_or_else(|| {
            warn!(
                container = %self.container_name,
                port,
                "Port not published; assuming it is reachable directly"
            );
            port
        });
        Ok(format!("http://{}:{host_port}", self.preview_host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_port_mappings() {
        assert_eq!(parse_host_port("0.0.0.0:49153\n[::]:49153\n"), Some(49153));
        assert_eq!(parse_host_port("[::]:8080"), Some(8080));
        assert_eq!(parse_host_port(""), None);
        assert_eq!(parse_host_port("Error: No public port"), None);
    }

    #[tokio::test]
    async fn missing_binary_is_launch_error() {
        let sandbox = DockerSandbox::new("blinker_sandbox_dev").with_binary("/nonexistent/docker");
        let err = sandbox.execute_command("echo hi").await.unwrap_err();
        assert!(matches!(err, SandboxError::Launch(_)));
    }

    #[tokio::test]
    async fn read_file_without_docker_fails() {
        let sandbox = DockerSandbox::new("blinker_sandbox_dev").with_binary("/nonexistent/docker");
        let err = sandbox.read_file("shot.png").await.unwrap_err();
        assert!(matches!(err, SandboxError::Launch(_)));
    }

    #[tokio::test]
    async fn stop_never_fails() {
        let sandbox = DockerSandbox::new("blinker_sandbox_dev").with_binary("/nonexistent/docker");
        assert!(sandbox.stop().await.is_ok());
    }

    #[tokio::test]
    async fn preview_link_falls_back_to_same_port() {
        let sandbox = DockerSandbox::new("c").with_binary("/nonexistent/docker");
        assert_eq!(sandbox.preview_link(5173).await.unwrap(), "http://localhost:5173");
    }
}
