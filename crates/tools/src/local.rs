//! Local sandbox: commands run as host processes in a working directory.
//!
//! No isolation beyond the working directory. Intended for development and
//! for hosts where the agent already runs inside a container.

use async_trait::async_trait;
use blinker_core::error::SandboxError;
use blinker_core::sandbox::{CommandOutput, Sandbox};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Run a prepared command and fold stdout and stderr into one output.
pub(crate) async fn run_to_output(
    command: &mut Command,
    label: &str,
) -> Result<CommandOutput, SandboxError> {
    let output = command
        .output()
        .await
        .map_err(|e| SandboxError::Launch(format!("{label}: {e}")))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let exit_code = output.status.code().unwrap_or(-1);

    let combined = if stderr.is_empty() {
        stdout.into_owned()
    } else if stdout.is_empty() {
        stderr.into_owned()
    } else {
        format!("{stdout}\n{stderr}")
    };

    if exit_code != 0 {
        warn!(label, exit_code, "Command exited non-zero");
    }

    Ok(CommandOutput {
        exit_code,
        output: combined.trim().to_string(),
    })
}

pub struct LocalSandbox {
    workdir: PathBuf,
    preview_host: String,
    started: AtomicBool,
}

impl LocalSandbox {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            preview_host: "localhost".into(),
            started: AtomicBool::new(false),
        }
    }

    pub fn with_preview_host(mut self, host: impl Into<String>) -> Self {
        self.preview_host = host.into();
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    async fn ensure_started(&self) -> Result<(), SandboxError> {
        if !self.started.load(Ordering::SeqCst) {
            self.start().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Sandbox for LocalSandbox {
    fn name(&self) -> &str {
        "local"
    }

    async fn start(&self) -> Result<(), SandboxError> {
        tokio::fs::create_dir_all(&self.workdir).await.map_err(|e| {
            SandboxError::Backend(format!(
                "cannot create workdir {}: {e}",
                self.workdir.display()
            ))
        })?;
        if !self.started.swap(true, Ordering::SeqCst) {
            info!(workdir = %self.workdir.display(), "Local sandbox started");
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), SandboxError> {
        self.started.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn execute_command(&self, command: &str) -> Result<CommandOutput, SandboxError> {
        self.ensure_started().await?;
        debug!(command = %command, "Executing local sandbox command");

        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };
        cmd.current_dir(&self.workdir);

        run_to_output(&mut cmd, "sh").await
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, SandboxError> {
        self.ensure_started().await?;
        let full = self.workdir.join(path);
        debug!(path = %full.display(), "Reading local sandbox file");
        tokio::fs::read(&full)
            .await
            .map_err(|e| SandboxError::Backend(format!("cannot read {}: {e}", full.display())))
    }

    async fn preview_link(&self, port: u16) -> Result<String, SandboxError> {
        Ok(format!("http://{}:{port}", self.preview_host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn execute_echo() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = LocalSandbox::new(dir.path());
        let out = sandbox.execute_command("echo hello").await.unwrap();
        assert!(out.success());
        assert_eq!(out.output, "hello");
    }

    #[tokio::test]
    async fn runs_in_workdir() {
        let dir = tempfile::tempdir().unwrap();
        let workdir = dir.path().join("nested");
        let sandbox = LocalSandbox::new(&workdir);
        sandbox.start().await.unwrap();
        assert!(workdir.is_dir());

        sandbox.execute_command("echo data > marker.txt").await.unwrap();
        assert!(workdir.join("marker.txt").exists());
    }

    #[tokio::test]
    async fn failing_command_reports_exit_code_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = LocalSandbox::new(dir.path());
        let out = sandbox
            .execute_command("echo out; echo err 1>&2; exit 3")
            .await
            .unwrap();
        assert_eq!(out.exit_code, 3);
        assert!(out.output.contains("out"));
        assert!(out.output.contains("err"));
    }

    #[tokio::test]
    async fn reads_file_bytes_relative_to_workdir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("shots")).unwrap();
        std::fs::write(dir.path().join("shots/a.png"), [0x89, b'P', b'N', b'G']).unwrap();

        let sandbox = LocalSandbox::new(dir.path());
        assert_eq!(sandbox.read_file("shots/a.png").await.unwrap(), vec![0x89, b'P', b'N', b'G']);
        assert!(matches!(
            sandbox.read_file("missing.png").await,
            Err(SandboxError::Backend(_))
        ));
    }

    #[tokio::test]
    async fn preview_link_uses_host() {
        let sandbox = LocalSandbox::new("/tmp").with_preview_host("dev.local");
        assert_eq!(sandbox.preview_link(3000).await.unwrap(), "http://dev.local:3000");
    }
}
