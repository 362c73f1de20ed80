//! WebSocket client for connecting to a ComfyUI instance.
//!
//! [`ComfyUIClient`] holds the connection configuration for a single
//! ComfyUI server. Call [`ComfyUIClient::connect`] to establish a live
//! [`ComfyUIConnection`], which is the production [`TransportSession`].

use std::time::Duration;

use async_trait::async_trait;
use comfygen_core::workflow::JobDescription;
use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::api::{ComfyUIApi, SubmitResponse};
use crate::config::ComfyUIConfig;
use crate::session::{Connector, Frame, TransportError, TransportSession};

/// Upper bound on the close handshake so `close()` never hangs.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Configuration handle for a ComfyUI instance.
///
/// Stores the WebSocket URL and an HTTP API client for one ComfyUI
/// server. Cheap to share; every [`connect`](Self::connect) yields an
/// independent connection.
pub struct ComfyUIClient {
    ws_url: String,
    api: ComfyUIApi,
}

/// A live WebSocket connection to a ComfyUI instance.
///
/// Owns the duplex stream for one `client_id` together with the HTTP
/// client used for that session's unary calls.
pub struct ComfyUIConnection {
    client_id: String,
    api: ComfyUIApi,
    /// `None` once the connection has been closed.
    ws_stream: Option<WsStream>,
}

impl ComfyUIClient {
    /// Create a new client targeting the server described by `config`.
    pub fn new(config: &ComfyUIConfig) -> Self {
        Self {
            ws_url: config.ws_url(),
            api: ComfyUIApi::new(config.api_url(), config.http_timeout),
        }
    }

    /// WebSocket base URL (e.g. `ws://host:8188`).
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// HTTP API client for calls that need no session (e.g. `/queue`).
    pub fn api(&self) -> &ComfyUIApi {
        &self.api
    }

    /// Connect to the ComfyUI WebSocket endpoint as `client_id`.
    ///
    /// The id is appended as the `clientId` query parameter so that
    /// ComfyUI addresses execution messages back to this connection.
    pub async fn connect(&self, client_id: &str) -> Result<ComfyUIConnection, ComfyUIClientError> {
        let url = format!("{}/ws?clientId={}", self.ws_url, client_id);

        let (ws_stream, _response) = connect_async(&url).await.map_err(|e| {
            ComfyUIClientError::Connection(format!(
                "Failed to connect to ComfyUI at {}: {e}",
                self.ws_url
            ))
        })?;

        tracing::info!(client_id = %client_id, "Connected to ComfyUI at {}", self.ws_url);

        Ok(ComfyUIConnection {
            client_id: client_id.to_string(),
            api: self.api.clone(),
            ws_stream: Some(ws_stream),
        })
    }
}

#[async_trait]
impl Connector for ComfyUIClient {
    type Session = ComfyUIConnection;

    async fn open(&self, client_id: &str) -> Result<ComfyUIConnection, TransportError> {
        Ok(self.connect(client_id).await?)
    }
}

#[async_trait]
impl TransportSession for ComfyUIConnection {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    async fn submit(&mut self, workflow: &JobDescription) -> Result<SubmitResponse, TransportError> {
        Ok(self.api.submit_workflow(workflow, &self.client_id).await?)
    }

    async fn next_frame(&mut self, wait: Duration) -> Result<Frame, TransportError> {
        let Some(ws_stream) = self.ws_stream.as_mut() else {
            return Err(ComfyUIClientError::Closed("connection already closed".into()).into());
        };

        let msg = match tokio::time::timeout(wait, ws_stream.next()).await {
            Err(_elapsed) => return Ok(Frame::Idle),
            Ok(None) => {
                return Err(ComfyUIClientError::Closed("stream ended".into()).into());
            }
            Ok(Some(msg)) => msg,
        };

        match msg {
            Ok(Message::Text(text)) => Ok(Frame::Text(text)),
            Ok(Message::Binary(data)) => {
                // Preview images; irrelevant to completion tracking.
                tracing::trace!(client_id = %self.client_id, len = data.len(), "Binary frame");
                Ok(Frame::Binary(data.len()))
            }
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => Ok(Frame::Control),
            Ok(Message::Close(frame)) => {
                tracing::info!(client_id = %self.client_id, ?frame, "ComfyUI WebSocket closed");
                Err(ComfyUIClientError::Closed(format!("{frame:?}")).into())
            }
            Err(e) => Err(ComfyUIClientError::Protocol(e.to_string()).into()),
        }
    }

    async fn fetch(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<u8>, TransportError> {
        Ok(self.api.get_bytes(path, query).await?)
    }

    async fn close(&mut self) {
        let Some(ws_stream) = self.ws_stream.take() else {
            return;
        };
        close_stream(&self.client_id, ws_stream).await;
    }
}

/// Send the close frame and wait (bounded) for the handshake.
async fn close_stream(client_id: &str, mut ws_stream: WsStream) {
    match tokio::time::timeout(CLOSE_TIMEOUT, ws_stream.close(None)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::debug!(client_id, error = %e, "Error closing WebSocket");
        }
        Err(_) => {
            tracing::debug!(client_id, "WebSocket close handshake timed out");
        }
    }
    tracing::info!(client_id, "WebSocket connection closed");
}

/// A connection dropped while still open (e.g. the owning request future
/// was cancelled) hands its stream to a background task that performs
/// the close handshake.
impl Drop for ComfyUIConnection {
    fn drop(&mut self) {
        let Some(ws_stream) = self.ws_stream.take() else {
            return;
        };

        tracing::warn!(
            client_id = %self.client_id,
            "ComfyUI connection dropped without close; closing in background",
        );
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let client_id = std::mem::take(&mut self.client_id);
                handle.spawn(async move {
                    close_stream(&client_id, ws_stream).await;
                });
            }
            Err(_) => {
                tracing::warn!(
                    client_id = %self.client_id,
                    "No runtime available; socket released without close frame",
                );
            }
        }
    }
}

/// Errors that can occur on the WebSocket side of a session.
#[derive(Debug, thiserror::Error)]
pub enum ComfyUIClientError {
    /// Failed to establish the initial WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A protocol-level error on an already-established connection.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server closed the connection, or it was already closed locally.
    #[error("Connection closed: {0}")]
    Closed(String),
}
