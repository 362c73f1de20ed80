use std::sync::Arc;

use comfygen_comfyui::ComfyUIService;

use crate::config::ServerConfig;
use crate::storage::ImageStorage;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Generation entry points for the configured ComfyUI server.
    pub comfyui: Arc<ComfyUIService>,
    /// Output folder for generated images.
    pub storage: Arc<ImageStorage>,
}

impl AppState {
    /// Build the state for `config`. Opens no connections.
    pub fn new(config: ServerConfig) -> Self {
        let comfyui = Arc::new(ComfyUIService::new(&config.comfyui));
        let storage = Arc::new(ImageStorage::new(config.output_folder.clone()));
        Self {
            config: Arc::new(config),
            comfyui,
            storage,
        }
    }
}
