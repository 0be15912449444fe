use std::path::PathBuf;

use crate::{codec::DecodedImage, constants::RECIPE_IMAGE_DIR, error::ApiError};

/// Persists uploaded files below a media root and renders their public URLs.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    base_url: String,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>, base_url: &str) -> Self {
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Self {
            root: root.into(),
            base_url,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Writes the image under a fresh name and returns its path relative to the root.
    pub async fn save(&self, image: DecodedImage) -> Result<String, ApiError> {
        let relative = format!(
            "{RECIPE_IMAGE_DIR}/{}.{}",
            uuid::Uuid::new_v4(),
            image.extension
        );
        let target = self.root.join(&relative);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ApiError::Internal(format!("Failed to create media dir: {e}")))?;
        }

        tokio::fs::write(&target, &image.bytes)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to store image: {e}")))?;

        log::debug!("Stored image {} ({} bytes)", relative, image.bytes.len());
        Ok(relative)
    }

    pub async fn remove(&self, path: &str) {
        if path.is_empty() {
            return;
        }

        if let Err(e) = tokio::fs::remove_file(self.root.join(path)).await {
            log::warn!("Failed to remove media file {path}: {e}");
        }
    }
}
