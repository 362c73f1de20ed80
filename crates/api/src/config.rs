use std::path::PathBuf;

use comfygen_comfyui::ComfyUIConfig;

/// Largest accepted request body (16 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    /// A single `*` allows any origin.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `330`). Applies to every
    /// route except the generation routes, which are bounded by their own
    /// run deadline.
    pub request_timeout_secs: u64,
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
    /// Directory generated images are written to.
    pub output_folder: PathBuf,
    /// Workflow template used by `POST /images/generate`.
    pub default_workflow_path: PathBuf,
    /// Upstream ComfyUI connection settings.
    pub comfyui: ComfyUIConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                  |
    /// |-------------------------|--------------------------|
    /// | `HOST`                  | `0.0.0.0`                |
    /// | `PORT`                  | `5000`                   |
    /// | `CORS_ORIGINS`          | `*`                      |
    /// | `REQUEST_TIMEOUT_SECS`  | `330`                    |
    /// | `MAX_BODY_BYTES`        | `16777216`               |
    /// | `OUTPUT_FOLDER`         | `outputs`                |
    /// | `DEFAULT_WORKFLOW_PATH` | `workflows/default.json` |
    ///
    /// ComfyUI settings are read by [`ComfyUIConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "330".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let max_body_bytes: usize = std::env::var("MAX_BODY_BYTES")
            .unwrap_or_else(|_| DEFAULT_MAX_BODY_BYTES.to_string())
            .parse()
            .expect("MAX_BODY_BYTES must be a valid usize");

        let output_folder =
            PathBuf::from(std::env::var("OUTPUT_FOLDER").unwrap_or_else(|_| "outputs".into()));

        let default_workflow_path = PathBuf::from(
            std::env::var("DEFAULT_WORKFLOW_PATH")
                .unwrap_or_else(|_| "workflows/default.json".into()),
        );

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            max_body_bytes,
            output_folder,
            default_workflow_path,
            comfyui: ComfyUIConfig::from_env(),
        }
    }

    /// Whether `CORS_ORIGINS` asks for any origin to be allowed.
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }
}
