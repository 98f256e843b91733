//! Configuration loading, validation, and management for Blinker.
//!
//! Loads configuration from `~/.blinker/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use blinker_core::agent::AgentConfig;
use blinker_core::mcp::McpServerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.blinker/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentSection,

    /// MCP tool servers
    #[serde(default)]
    pub mcp: McpConfig,

    /// Thread store backend
    #[serde(default)]
    pub store: StoreConfig,

    /// Sandbox backend
    #[serde(default)]
    pub sandbox: SandboxConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSection {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

fn default_model() -> String {
    "anthropic/claude-sonnet-4".into()
}
fn default_max_iterations() -> u32 {
    150
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: 0.0,
            max_tokens: None,
            max_iterations: default_max_iterations(),
        }
    }
}

impl AgentSection {
    pub fn to_agent_config(&self) -> AgentConfig {
        AgentConfig {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            max_iterations: self.max_iterations,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct McpConfig {
    /// Registry gateway that hosts the servers
    #[serde(default = "default_mcp_base_url")]
    pub base_url: String,

    /// Credential appended to every server URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Per-request timeout for handshakes and tool calls
    #[serde(default = "default_mcp_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub servers: Vec<McpServerConfig>,
}

fn default_mcp_base_url() -> String {
    "https://server.smithery.ai".into()
}
fn default_mcp_timeout() -> u64 {
    30
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            base_url: default_mcp_base_url(),
            api_key: None,
            timeout_secs: default_mcp_timeout(),
            servers: vec![],
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for McpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("timeout_secs", &self.timeout_secs)
            .field("servers", &self.servers)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// SQLite database file; relative paths resolve against the config dir
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_path() -> String {
    "threads.db".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
        }
    }
}

impl StoreConfig {
    pub fn resolved_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.path);
        if path.is_absolute() {
            path
        } else {
            AppConfig::config_dir().join(path)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SandboxKind {
    /// Commands run as host processes in a working directory
    #[default]
    Local,
    /// Commands run in an existing Docker container
    Docker,
}

impl std::str::FromStr for SandboxKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(SandboxKind::Local),
            "docker" => Ok(SandboxKind::Docker),
            other => Err(ConfigError::ValidationError(format!(
                "unknown sandbox kind '{other}' (expected 'local' or 'docker')"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    #[serde(default)]
    pub kind: SandboxKind,

    /// Container to attach to when `kind = "docker"`
    #[serde(default = "default_container_name")]
    pub container_name: String,

    /// Working directory for the local backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<String>,

    /// Host that preview links point at
    #[serde(default = "default_preview_host")]
    pub preview_host: String,
}

fn default_container_name() -> String {
    "blinker_sandbox_dev".into()
}
fn default_preview_host() -> String {
    "localhost".into()
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            kind: SandboxKind::default(),
            container_name: default_container_name(),
            workdir: None,
            preview_host: default_preview_host(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.blinker/config.toml).
    ///
    /// Environment overrides:
    /// - `BLINKER_MCP_API_KEY`, then `SMITHERY_API_KEY` (only when the file has no key)
    /// - `BLINKER_MODEL`
    /// - `BLINKER_SANDBOX` (`local` or `docker`)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(
        &mut self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if self.mcp.api_key.is_none() {
            self.mcp.api_key = env("BLINKER_MCP_API_KEY").or_else(|| env("SMITHERY_API_KEY"));
        }

        if let Some(model) = env("BLINKER_MODEL") {
            self.agent.model = model;
        }

        if let Some(kind) = env("BLINKER_SANDBOX") {
            self.sandbox.kind = kind.parse()?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".blinker")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        if self.agent.temperature < 0.0 || self.agent.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "agent.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if !self.mcp.base_url.starts_with("http://")
            && !self.mcp.base_url.starts_with("https://")
            && !self.mcp.base_url.starts_with("ws://")
            && !self.mcp.base_url.starts_with("wss://")
        {
            return Err(ConfigError::ValidationError(format!(
                "mcp.base_url must be an http(s) or ws(s) URL, got '{}'",
                self.mcp.base_url
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for server in &self.mcp.servers {
            if server.qualified_name.is_empty() {
                return Err(ConfigError::ValidationError(
                    "mcp.servers entries need a non-empty qualifiedName".into(),
                ));
            }
            if !seen.insert(server.qualified_name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate MCP server '{}'",
                    server.qualified_name
                )));
            }
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `blinker init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
