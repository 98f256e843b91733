//! MCP connection manager.
//!
//! Owns the cache of connected servers keyed by qualified name. Connecting
//! performs the `initialize` handshake and fetches the tool list once; tool
//! calls always open a fresh session of their own.

use crate::naming::decode_tool_name;
use crate::result::ToolOutcome;
use crate::schema::project_enabled;
use crate::session::McpSession;
use crate::transport::{Connector, WebSocketConnector, redact_url};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use blinker_config::McpConfig;
use blinker_core::error::McpError;
use blinker_core::mcp::{McpServerConfig, McpToolDescriptor};
use blinker_core::tool::ToolDefinition;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Where servers live and how to authenticate to them.
#[derive(Clone)]
pub struct McpSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl McpSettings {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl From<&McpConfig> for McpSettings {
    fn from(config: &McpConfig) -> Self {
        Self::new(config.base_url.clone(), config.api_key.clone())
            .with_timeout(Duration::from_secs(config.timeout_secs))
    }
}

impl std::fmt::Debug for McpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// A connected server and the tools it reported.
#[derive(Debug, Clone)]
pub struct McpConnection {
    pub server: McpServerConfig,
    pub tools: Vec<McpToolDescriptor>,
}

impl McpConnection {
    pub fn qualified_name(&self) -> &str {
        &self.server.qualified_name
    }
}

/// Details about one routed tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct McpToolInfo {
    pub server: String,
    pub qualified_name: String,
    pub original_name: String,
    pub description: Option<String>,
    pub enabled: bool,
}

pub struct McpManager {
    settings: McpSettings,
    connector: Arc<dyn Connector>,
    connections: RwLock<HashMap<String, Arc<McpConnection>>>,
    connect_gates: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    /// Bumped by `disconnect_all`; connects started before a bump are discarded.
    generation: AtomicU64,
}

impl McpManager {
    /// A manager that reaches servers over WebSocket.
    pub fn new(settings: McpSettings) -> Self {
        Self::with_connector(settings, Arc::new(WebSocketConnector))
    }

    pub fn with_connector(settings: McpSettings, connector: Arc<dyn Connector>) -> Self {
        Self {
            settings,
            connector,
            connections: RwLock::new(HashMap::new()),
            connect_gates: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &McpSettings {
        &self.settings
    }

    /// Access URL for a server: `{base}/{qualifiedName}/mcp?config=..&api_key=..`.
    pub fn server_url(&self, server: &McpServerConfig) -> Result<String, McpError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(McpError::MissingCredential)?;

        let config_json = serde_json::to_string(&server.config)
            .map_err(|e| McpError::Malformed(format!("server config: {e}")))?;
        let config_b64 = BASE64.encode(config_json);

        Ok(format!(
            "{}/{}/mcp?config={}&api_key={}",
            self.settings.base_url.trim_end_matches('/'),
            server.qualified_name,
            urlencoding::encode(&config_b64),
            urlencoding::encode(api_key),
        ))
    }

    /// Connect to a server and cache its tools. Already-connected servers
    /// are returned from the cache; concurrent calls for the same server
    /// share one handshake.
    pub async fn connect_server(
        &self,
        server: &McpServerConfig,
    ) -> Result<Arc<McpConnection>, McpError> {
        let key = server.qualified_name.clone();

        if let Some(conn) = self.cached(&key).await {
            info!(qualified_name = %key, "MCP server already connected");
            return Ok(conn);
        }

        let gate = self.connect_gates.lock().await.entry(key.clone()).or_default().clone();
        let _guard = gate.lock().await;

        if let Some(conn) = self.cached(&key).await {
            debug!(qualified_name = %key, "MCP server connected while waiting");
            return Ok(conn);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        info!(qualified_name = %key, "Connecting to MCP server");
        let tools = match self.discover(server).await {
            Ok(tools) => tools,
            Err(e) => {
                error!(qualified_name = %key, "Failed to connect to MCP server: {e}");
                return Err(e);
            }
        };

        let conn = Arc::new(McpConnection {
            server: server.clone(),
            tools,
        });

        let mut connections = self.connections.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            warn!(qualified_name = %key, "Connections were reset during handshake; discarding");
            return Err(McpError::Reset(key));
        }

        info!(
            qualified_name = %key,
            tools = ?conn.tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            "MCP server connected"
        );
        connections.insert(key, conn.clone());
        Ok(conn)
    }

    /// Connect to every server; failures are logged and skipped.
    pub async fn connect_all(&self, servers: &[McpServerConfig]) {
        for server in servers {
            if let Err(e) = self.connect_server(server).await {
                warn!(qualified_name = %server.qualified_name, "Skipping MCP server: {e}");
            }
        }
    }

    /// Drop every connection, then connect to `servers` from scratch.
    pub async fn reload(&self, servers: &[McpServerConfig]) {
        self.disconnect_all().await;
        self.connect_all(servers).await;
    }

    /// Definitions for every enabled tool of every connected server.
    pub async fn get_all_tools_for_model(&self) -> Vec<ToolDefinition> {
        self.connections()
            .await
            .iter()
            .flat_map(|conn| project_enabled(&conn.server, &conn.tools))
            .collect()
    }

    /// Run a routed tool on its server.
    ///
    /// A malformed id, an unknown server, or a missing credential is an
    /// `Err`. Everything that goes wrong after that is reported inside the
    /// outcome with `is_error` set.
    pub async fn execute_tool(
        &self,
        tool_id: &str,
        arguments: Value,
    ) -> Result<ToolOutcome, McpError> {
        let routed = decode_tool_name(tool_id)?;
        let conn = self
            .cached(&routed.qualified_name)
            .await
            .ok_or_else(|| McpError::NotConnected(routed.qualified_name.clone()))?;
        let url = self.server_url(&conn.server)?;

        info!(
            qualified_name = %routed.qualified_name,
            tool = %routed.tool_name,
            "Executing MCP tool"
        );

        match self.call_once(&url, &routed.tool_name, &arguments).await {
            Ok(result) => Ok(ToolOutcome::from(result)),
            Err(e) => {
                error!(tool_id, "Error executing MCP tool: {e}");
                Ok(ToolOutcome::error(e))
            }
        }
    }

    /// Metadata for a routed tool id, if it names a known tool.
    pub async fn tool_info(&self, tool_id: &str) -> Option<McpToolInfo> {
        let routed = decode_tool_name(tool_id).ok()?;
        let conn = self.cached(&routed.qualified_name).await?;
        let tool = conn.tools.iter().find(|t| t.name == routed.tool_name)?;

        Some(McpToolInfo {
            server: conn.server.display_name.clone(),
            qualified_name: routed.qualified_name,
            original_name: tool.name.clone(),
            description: tool.description.clone(),
            enabled: conn.server.is_tool_enabled(&tool.name),
        })
    }

    /// Connected servers, ordered by qualified name.
    pub async fn connections(&self) -> Vec<Arc<McpConnection>> {
        let mut conns: Vec<_> = self.connections.read().await.values().cloned().collect();
        conns.sort_by(|a, b| a.qualified_name().cmp(b.qualified_name()));
        conns
    }

    /// Forget every connection. Safe to call when nothing is connected.
    ///
    /// Handshakes still in flight finish but are not cached.
    pub async fn disconnect_all(&self) {
        let removed = {
            let mut connections = self.connections.write().await;
            self.generation.fetch_add(1, Ordering::SeqCst);
            let n = connections.len();
            connections.clear();
            n
        };
        info!(removed, "Cleared all MCP server connections");
    }

    async fn cached(&self, qualified_name: &str) -> Option<Arc<McpConnection>> {
        self.connections.read().await.get(qualified_name).cloned()
    }

    async fn open_session(&self, url: &str) -> Result<McpSession, McpError> {
        debug!(url = redact_url(url), "Opening MCP session");
        let transport = self.connector.connect(url).await?;
        let mut session = McpSession::new(transport, self.settings.timeout);
        if let Err(e) = session.initialize().await {
            if let Err(close_err) = session.close().await {
                warn!("Error closing MCP session: {close_err}");
            }
            return Err(e);
        }
        Ok(session)
    }

    async fn discover(&self, server: &McpServerConfig) -> Result<Vec<McpToolDescriptor>, McpError> {
        let url = self.server_url(server)?;
        let mut session = self.open_session(&url).await?;
        let tools = session.list_tools().await;
        if let Err(e) = session.close().await {
            warn!("Error closing MCP session: {e}");
        }
        tools
    }

    async fn call_once(&self, url: &str, tool_name: &str, arguments: &Value) -> Result<Value, McpError> {
        let mut session = self.open_session(url).await?;
        let result = session.call_tool(tool_name, arguments).await;
        if let Err(e) = session.close().await {
            warn!("Error closing MCP session: {e}");
        }
        result
    }
}
