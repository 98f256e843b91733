//! Message transport to an MCP server.
//!
//! A transport moves whole JSON-RPC text frames; framing and request/response
//! matching live in [`crate::session`]. The production transport is a
//! WebSocket; tests substitute scripted transports through [`Connector`].

use async_trait::async_trait;
use blinker_core::error::McpError;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

/// A bidirectional stream of JSON-RPC text frames.
#[async_trait]
pub trait McpTransport: Send {
    async fn send(&mut self, frame: String) -> Result<(), McpError>;

    /// Next inbound frame, or `None` once the peer has closed.
    async fn recv(&mut self) -> Result<Option<String>, McpError>;

    async fn close(&mut self) -> Result<(), McpError>;
}

/// Opens transports to server URLs.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn McpTransport>, McpError>;
}

/// Rewrite an `http(s)://` URL to its `ws(s)://` equivalent.
pub fn to_websocket_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        url.to_string()
    }
}

/// Strip the query string so credentials never reach the logs.
pub(crate) fn redact_url(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects over WebSocket text frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn McpTransport>, McpError> {
        let ws_url = to_websocket_url(url);
        debug!(url = redact_url(&ws_url), "Opening MCP WebSocket");
        let (stream, _response) = tokio_tungstenite::connect_async(ws_url.as_str())
            .await
            .map_err(|e| McpError::Transport(format!("WebSocket connect failed: {e}")))?;
        Ok(Box::new(WebSocketTransport { stream }))
    }
}

pub struct WebSocketTransport {
    stream: WsStream,
}

#[async_trait]
impl McpTransport for WebSocketTransport {
    async fn send(&mut self, frame: String) -> Result<(), McpError> {
        self.stream
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| McpError::Transport(format!("WebSocket send failed: {e}")))
    }

    async fn recv(&mut self) -> Result<Option<String>, McpError> {
        while let Some(message) = self.stream.next().await {
            let message =
                message.map_err(|e| McpError::Transport(format!("WebSocket read failed: {e}")))?;
            match message {
                Message::Text(text) => return Ok(Some(text.as_str().to_owned())),
                Message::Binary(bytes) => {
                    return String::from_utf8(bytes.to_vec())
                        .map(Some)
                        .map_err(|e| McpError::Malformed(format!("non-UTF-8 frame: {e}")));
                }
                Message::Close(_) => return Ok(None),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
        Ok(None)
    }

    async fn close(&mut self) -> Result<(), McpError> {
        if let Err(e) = self.stream.close(None).await {
            warn!("Error closing MCP WebSocket: {e}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn http_schemes_become_ws() {
        assert_eq!(to_websocket_url("https://server.smithery.ai/exa/mcp"), "wss://server.smithery.ai/exa/mcp");
        assert_eq!(to_websocket_url("http://localhost:9000/x"), "ws://localhost:9000/x");
        assert_eq!(to_websocket_url("ws://already"), "ws://already");
    }

    #[test]
    fn redaction_drops_query() {
        assert_eq!(redact_url("wss://h/exa/mcp?api_key=secret"), "wss://h/exa/mcp");
        assert_eq!(redact_url("wss://h/exa/mcp"), "wss://h/exa/mcp");
    }

    #[tokio::test]
    async fn websocket_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            while let Some(Ok(msg)) = ws.next().await {
                if let Message::Text(text) = msg {
                    let reply = format!("echo:{}", text.as_str());
                    ws.send(Message::Text(reply.into())).await.unwrap();
                    break;
                }
            }
            ws.close(None).await.ok();
        });

        let connector = WebSocketConnector;
        let mut transport = connector
            .connect(&format!("http://{addr}/exa/mcp?api_key=k"))
            .await
            .unwrap();
        transport.send("hello".into()).await.unwrap();
        assert_eq!(transport.recv().await.unwrap().as_deref(), Some("echo:hello"));
        assert_eq!(transport.recv().await.unwrap(), None);
        transport.close().await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn connect_failure_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = WebSocketConnector.connect(&format!("ws://{addr}/mcp")).await;
        assert!(matches!(result, Err(McpError::Transport(_))));
    }
}
