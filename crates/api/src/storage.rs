//! Local output folder for generated images.
//!
//! Files are written flat into one directory under names produced by
//! [`artifact_filename`]. Every caller-supplied filename passes through
//! [`validate_filename`] before it touches the filesystem.

use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use comfygen_comfyui::ResultSet;
use comfygen_core::error::CoreError;
use comfygen_core::naming::{artifact_filename, validate_filename, IMAGE_EXTENSION};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::response::download_url;

/// A file written by [`ImageStorage::save_results`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedImage {
    pub node_id: String,
    pub filename: String,
    pub path: PathBuf,
}

/// Listing entry for one stored image.
#[derive(Debug, Clone, Serialize)]
pub struct StoredImage {
    pub filename: String,
    pub size: u64,
    pub created: DateTime<Utc>,
    pub url: String,
}

/// The output folder.
#[derive(Debug, Clone)]
pub struct ImageStorage {
    root: PathBuf,
}

impl ImageStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the output folder if it does not exist yet.
    pub async fn ensure_root(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Resolve `filename` inside the output folder, rejecting anything
    /// that could escape it.
    pub fn path_for(&self, filename: &str) -> Result<PathBuf, CoreError> {
        validate_filename(filename)?;
        Ok(self.root.join(filename))
    }

    /// Write `data` as `filename`, replacing any existing file.
    pub async fn save(&self, filename: &str, data: &[u8]) -> AppResult<PathBuf> {
        let path = self.path_for(filename)?;
        self.ensure_root().await?;
        tokio::fs::write(&path, data).await?;
        tracing::info!(path = %path.display(), bytes = data.len(), "Image saved");
        Ok(path)
    }

    /// Save every artifact of a run as `{prefix}_{node}_{index}.png`,
    /// in result order.
    pub async fn save_results(&self, prefix: &str, results: &ResultSet) -> AppResult<Vec<SavedImage>> {
        let mut saved = Vec::new();
        for (node_id, artifacts) in results {
            for (index, artifact) in artifacts.iter().enumerate() {
                let filename = artifact_filename(prefix, node_id, index);
                let path = self.save(&filename, &artifact.data).await?;
                saved.push(SavedImage {
                    node_id: node_id.clone(),
                    filename,
                    path,
                });
            }
        }
        Ok(saved)
    }

    /// Read a stored image.
    ///
    /// Fails with [`CoreError::NotFound`] if no such file exists.
    pub async fn read(&self, filename: &str) -> AppResult<Vec<u8>> {
        let path = self.path_for(filename)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(AppError::Core(CoreError::NotFound {
                entity: "Image",
                id: filename.to_string(),
            })),
            Err(e) => Err(e.into()),
        }
    }

    /// List stored PNG images, newest first.
    ///
    /// A missing output folder lists as empty.
    pub async fn list(&self) -> AppResult<Vec<StoredImage>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut images = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(IMAGE_EXTENSION) {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            // Not every filesystem records a creation time.
            let created = metadata.created().or_else(|_| metadata.modified())?;
            images.push(StoredImage {
                filename: filename.to_string(),
                size: metadata.len(),
                created: DateTime::<Utc>::from(created),
                url: download_url(filename),
            });
        }

        images.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(images)
    }
}
