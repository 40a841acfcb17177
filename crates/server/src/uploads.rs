//! # Hosted Uploads
//!
//! A local-directory `ImageHost` for by-reference encoding. Each image is
//! written under a fresh UUID name, served from `/uploads`, and deleted once its
//! inference call finishes, so concurrent requests never share a file.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use stockmeta::{errors::InferenceError, ImageHost, UploadedImage};
use tracing::debug;
use uuid::Uuid;

/// The route prefix hosted images are served under.
pub const UPLOADS_ROUTE: &str = "/uploads";

#[derive(Debug, Clone)]
pub struct LocalUploadHost {
    dir: PathBuf,
    public_base_url: String,
}

impl LocalUploadHost {
    /// Creates the upload directory if needed.
    pub async fn new(dir: impl Into<PathBuf>, public_base_url: &str) -> std::io::Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Maps a URL this host produced back to its file, refusing anything else.
    fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        let prefix = format!("{}{UPLOADS_ROUTE}/", self.public_base_url);
        let name = url.strip_prefix(&prefix)?;
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return None;
        }
        Some(self.dir.join(name))
    }
}

/// The file extension for a stored image. Only the extension of the caller's
/// filename reaches the disk.
fn extension_for(image: &UploadedImage) -> String {
    Path::new(&image.filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .or_else(|| {
            mime_guess::get_mime_extensions_str(&image.content_type)
                .and_then(|exts| exts.first())
                .map(|ext| ext.to_string())
        })
        .unwrap_or_else(|| "img".to_string())
}

#[async_trait]
impl ImageHost for LocalUploadHost {
    async fn publish(&self, image: &UploadedImage) -> Result<String, InferenceError> {
        let name = format!("{}.{}", Uuid::new_v4(), extension_for(image));
        let path = self.dir.join(&name);
        tokio::fs::write(&path, &image.bytes)
            .await
            .map_err(|e| InferenceError::ImageHost(format!("{}: {e}", path.display())))?;
        debug!(filename = %image.filename, stored = %name, "Hosted upload");
        Ok(format!("{}{UPLOADS_ROUTE}/{name}", self.public_base_url))
    }

    async fn release(&self, url: &str) -> Result<(), InferenceError> {
        let path = self
            .path_for_url(url)
            .ok_or_else(|| InferenceError::ImageHost(format!("not a hosted upload: {url}")))?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| InferenceError::ImageHost(format!("{}: {e}", path.display())))
    }
}
