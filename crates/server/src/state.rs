//! # Application State
//!
//! This module defines the shared application state (`AppState`) and the logic
//! for building it at startup. The pipeline, and the inference client inside
//! it, are created once and shared read-only by every request.

use crate::{
    config::{AppConfig, ImageEncodingKind},
    providers::create_provider,
    uploads::LocalUploadHost,
};
use std::{path::PathBuf, sync::Arc};
use stockmeta::{ImageEncoding, MetadataPipeline};
use tracing::info;

/// The shared application state, accessible from all request handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// The application's configuration, loaded from `config.yml`.
    pub config: Arc<AppConfig>,
    pub pipeline: Arc<MetadataPipeline>,
    /// Set when images are served for by-reference encoding.
    pub upload_dir: Option<PathBuf>,
}

/// Builds the shared application state from the configuration.
pub async fn build_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let provider = create_provider(&config.provider)?;

    let (encoding, upload_dir) = match config.pipeline.image_encoding {
        ImageEncodingKind::Inline => (ImageEncoding::Inline, None),
        ImageEncodingKind::Reference => {
            let base_url = config.uploads.public_base_url.as_deref().ok_or_else(|| {
                anyhow::anyhow!("uploads.public_base_url is required for reference encoding")
            })?;
            let host = LocalUploadHost::new(&config.uploads.dir, base_url).await?;
            info!(dir = %host.dir().display(), "Serving hosted uploads");
            let dir = host.dir().to_path_buf();
            (ImageEncoding::Reference(Arc::new(host)), Some(dir))
        }
    };

    let mut builder = MetadataPipeline::builder()
        .provider(provider)
        .encoding(encoding)
        .sheet_name(config.export.sheet_name.clone())
        .max_images(config.pipeline.max_images)
        .concurrency(config.pipeline.concurrency)
        .call_timeout(config.pipeline.call_timeout())
        .batch_timeout(config.pipeline.batch_timeout());
    if let Some(prompt) = &config.pipeline.prompt {
        builder = builder.prompt(prompt.clone());
    }
    let pipeline = builder.build()?;
    info!(?pipeline, "Initialized metadata pipeline");

    Ok(AppState {
        config: Arc::new(config),
        pipeline: Arc::new(pipeline),
        upload_dir,
    })
}
