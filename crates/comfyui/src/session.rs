//! The transport seam between [`JobClient`](crate::job::JobClient) and a
//! ComfyUI server.
//!
//! A [`TransportSession`] bundles one WebSocket (duplex) connection with
//! the unary HTTP calls made on behalf of the same `client_id`. A
//! [`Connector`] opens sessions. The production implementations live in
//! [`crate::client`]; tests substitute scripted fakes.

use std::time::Duration;

use async_trait::async_trait;
use comfygen_core::workflow::JobDescription;

use crate::api::{ComfyUIApiError, SubmitResponse};
use crate::client::ComfyUIClientError;

/// One frame (or the lack of one) read from the duplex channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A text frame carrying a JSON message.
    Text(String),
    /// A binary frame (preview images); carries the payload length.
    Binary(usize),
    /// Ping/pong and other control frames.
    Control,
    /// Nothing arrived within the requested wait. Not an error.
    Idle,
}

/// Errors raised by a [`TransportSession`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// A unary HTTP call failed.
    #[error(transparent)]
    Api(#[from] ComfyUIApiError),

    /// The WebSocket handshake or stream failed.
    #[error(transparent)]
    Socket(#[from] ComfyUIClientError),

    /// A unary response body could not be decoded.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A duplex connection plus unary channel scoped to one `client_id`.
#[async_trait]
pub trait TransportSession: Send + Sync {
    /// Correlation identity sent in the WebSocket handshake.
    fn client_id(&self) -> &str;

    /// Queue a workflow (`POST /prompt`) under this session's `client_id`.
    async fn submit(&mut self, workflow: &JobDescription)
        -> Result<SubmitResponse, TransportError>;

    /// Wait at most `wait` for the next duplex frame.
    ///
    /// Returns [`Frame::Idle`] on an expired wait. A closed or broken
    /// stream is an error.
    async fn next_frame(&mut self, wait: Duration) -> Result<Frame, TransportError>;

    /// Unary `GET {path}?{query}` returning the raw body.
    async fn fetch(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<u8>, TransportError>;

    /// Close the duplex channel. Idempotent and infallible.
    async fn close(&mut self);
}

/// Opens [`TransportSession`]s against one server.
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: TransportSession;

    /// Handshake a new session identified by `client_id`.
    async fn open(&self, client_id: &str) -> Result<Self::Session, TransportError>;
}
