//! Tools that act on the sandbox.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use blinker_core::error::ToolError;
use blinker_core::message::{ThreadId, ThreadMessage};
use blinker_core::sandbox::Sandbox;
use blinker_core::thread::ThreadStore;
use blinker_core::tool::{Tool, ToolResult};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Largest image `see_image` will load.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Runs a shell command inside the sandbox.
pub struct ExecuteCommandTool {
    sandbox: Arc<dyn Sandbox>,
}

impl ExecuteCommandTool {
    pub fn new(sandbox: Arc<dyn Sandbox>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for ExecuteCommandTool {
    fn name(&self) -> &str {
        "execute_command"
    }

    fn description(&self) -> &str {
        "Execute a shell command inside the sandbox and return its combined output and exit code."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let command = arguments["command"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'command' argument".into()))?;

        debug!(sandbox = self.sandbox.name(), command = %command, "execute_command");

        let out = self
            .sandbox
            .execute_command(command)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "execute_command".into(),
                reason: e.to_string(),
            })?;

        let text = if out.success() {
            out.output.clone()
        } else {
            format!("[exit code: {}]\n{}", out.exit_code, out.output)
        };

        Ok(ToolResult {
            call_id: String::new(),
            success: out.success(),
            output: text.trim().to_string(),
            data: Some(json!({ "exit_code": out.exit_code })),
        })
    }
}

/// Returns a URL reaching a port inside the sandbox.
pub struct ExposePortTool {
    sandbox: Arc<dyn Sandbox>,
}

impl ExposePortTool {
    pub fn new(sandbox: Arc<dyn Sandbox>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for ExposePortTool {
    fn name(&self) -> &str {
        "expose_port"
    }

    fn description(&self) -> &str {
        "Get a public preview URL for a service listening on a port inside the sandbox."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "port": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": 65535,
                    "description": "The port the service listens on"
                }
            },
            "required": ["port"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let port = arguments["port"]
            .as_u64()
            .and_then(|p| u16::try_from(p).ok())
            .filter(|p| *p != 0)
            .ok_or_else(|| ToolError::InvalidArguments("'port' must be between 1 and 65535".into()))?;

        let url = self
            .sandbox
            .preview_link(port)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "expose_port".into(),
                reason: e.to_string(),
            })?;

        Ok(ToolResult::ok(url.clone()).with_data(json!({ "port": port, "url": url })))
    }
}

/// Loads an image from the sandbox so the model sees it on its next call.
///
/// The image is appended to the thread as an `image_context` entry; the
/// context builder shows it once and then deletes it.
pub struct SeeImageTool {
    sandbox: Arc<dyn Sandbox>,
    store: Arc<dyn ThreadStore>,
    thread_id: ThreadId,
}

impl SeeImageTool {
    pub fn new(sandbox: Arc<dyn Sandbox>, store: Arc<dyn ThreadStore>, thread_id: ThreadId) -> Self {
        Self {
            sandbox,
            store,
            thread_id,
        }
    }
}

/// Strip a leading `/workspace` so paths resolve inside the sandbox workdir.
fn clean_path(path: &str) -> &str {
    let path = path.trim();
    let path = path.strip_prefix("/workspace").unwrap_or(path);
    path.trim_start_matches('/')
}

/// Image mime type from the file extension.
pub fn image_mime_type(path: &str) -> Option<&'static str> {
    let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

#[async_trait]
impl Tool for SeeImageTool {
    fn name(&self) -> &str {
        "see_image"
    }

    fn description(&self) -> &str {
        "Look at an image file in the sandbox workspace. The image is shown to you on your next turn."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path of the image relative to the workspace, e.g. 'screenshots/page.png'. Supported: JPG, PNG, GIF, WEBP up to 10MB."
                }
            },
            "required": ["file_path"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let raw = arguments["file_path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'file_path' argument".into()))?;
        let path = clean_path(raw);
        if path.is_empty() {
            return Err(ToolError::InvalidArguments("'file_path' must name a file".into()));
        }

        let Some(mime_type) = image_mime_type(path) else {
            return Ok(ToolResult::failed(format!(
                "Unsupported or unknown image format for file: '{path}'. Supported: JPG, PNG, GIF, WEBP."
            )));
        };

        let bytes = match self.sandbox.read_file(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path, "see_image read failed: {e}");
                return Ok(ToolResult::failed(format!("Image file not found at path: '{path}'")));
            }
        };

        if bytes.len() > MAX_IMAGE_BYTES {
            return Ok(ToolResult::failed(format!(
                "Image file '{path}' is too large ({:.2}MB). Maximum size is {}MB.",
                bytes.len() as f64 / (1024.0 * 1024.0),
                MAX_IMAGE_BYTES / (1024 * 1024)
            )));
        }

        let size = bytes.len();
        let message = ThreadMessage::image_context(&self.thread_id, BASE64.encode(&bytes), mime_type, path);
        self.store
            .append(message)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "see_image".into(),
                reason: e.to_string(),
            })?;

        info!(thread_id = %self.thread_id, path, size, "Image queued for next turn");
        Ok(ToolResult::ok(format!("Successfully loaded the image '{path}'."))
            .with_data(json!({ "file_path": path, "mime_type": mime_type, "file_size": size })))
    }
}
