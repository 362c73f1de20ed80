//! Connection settings for one ComfyUI server.

use std::time::Duration;

use comfygen_core::workflow::DEFAULT_TIMEOUT_SECS;

/// Default `host:port` of a local ComfyUI install.
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8188";

/// Default per-receive wait on the WebSocket before re-checking the deadline.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Default I/O timeout for unary HTTP calls.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Settings for talking to a single ComfyUI server.
///
/// Passed explicitly into [`ComfyUIClient`](crate::client::ComfyUIClient)
/// and [`JobClient`](crate::job::JobClient) construction.
#[derive(Debug, Clone)]
pub struct ComfyUIConfig {
    /// Server address as `host:port` (no scheme).
    pub server_address: String,
    /// Overall generation deadline used when the caller supplies none.
    pub default_timeout: Duration,
    /// Upper bound on a single WebSocket receive.
    pub poll_interval: Duration,
    /// I/O timeout for unary HTTP calls.
    pub http_timeout: Duration,
}

impl Default for ComfyUIConfig {
    fn default() -> Self {
        Self {
            server_address: DEFAULT_SERVER_ADDRESS.to_string(),
            default_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl ComfyUIConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default          |
    /// |-----------------------------|------------------|
    /// | `COMFYUI_SERVER`            | `127.0.0.1:8188` |
    /// | `WEBSOCKET_TIMEOUT`         | `300` (seconds)  |
    /// | `COMFYUI_POLL_INTERVAL_MS`  | `1000`           |
    /// | `COMFYUI_HTTP_TIMEOUT_SECS` | `30`             |
    pub fn from_env() -> Self {
        let server_address =
            std::env::var("COMFYUI_SERVER").unwrap_or_else(|_| DEFAULT_SERVER_ADDRESS.into());

        let default_timeout_secs: u64 = std::env::var("WEBSOCKET_TIMEOUT")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
            .parse()
            .expect("WEBSOCKET_TIMEOUT must be a valid u64");

        let poll_interval_ms: u64 = std::env::var("COMFYUI_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| DEFAULT_POLL_INTERVAL_MS.to_string())
            .parse()
            .expect("COMFYUI_POLL_INTERVAL_MS must be a valid u64");

        let http_timeout_secs: u64 = std::env::var("COMFYUI_HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_HTTP_TIMEOUT_SECS.to_string())
            .parse()
            .expect("COMFYUI_HTTP_TIMEOUT_SECS must be a valid u64");

        Self {
            server_address: normalize_address(&server_address),
            default_timeout: Duration::from_secs(default_timeout_secs),
            poll_interval: Duration::from_millis(poll_interval_ms.max(1)),
            http_timeout: Duration::from_secs(http_timeout_secs),
        }
    }

    /// HTTP base URL, e.g. `http://127.0.0.1:8188`.
    pub fn api_url(&self) -> String {
        format!("http://{}", self.server_address)
    }

    /// WebSocket base URL, e.g. `ws://127.0.0.1:8188`.
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.server_address)
    }
}

/// Strip any scheme and trailing slash so that `http://host:8188/` and
/// `host:8188` configure the same server.
fn normalize_address(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .split_once("://")
        .map_or(trimmed, |(_, rest)| rest);
    without_scheme.trim_end_matches('/').to_string()
}
