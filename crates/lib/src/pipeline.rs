//! # Batch Extraction Pipeline
//!
//! Validates an upload batch, sends every image to the vision provider with the
//! same prompt, parses each reply, and assembles the rows into an
//! `ExportDocument` in upload order.
//!
//! Images are processed with bounded concurrency. `buffered` yields results in
//! input order regardless of completion order, and the first failure ends the
//! batch: the remaining in-flight calls are dropped and no rows are returned.

use crate::{
    encoding::{ImageEncoding, ImageHost, ImagePayload},
    errors::{InferenceError, MetadataError, UploadError},
    export::validate_sheet_name,
    parse::parse_metadata,
    prompts::{EXPECTED_KEYWORD_COUNT, STOCK_METADATA_PROMPT},
    providers::ai::VisionProvider,
    types::{ExportDocument, ResultRow, UploadedImage, DEFAULT_SHEET_NAME},
};
use futures::{stream, StreamExt, TryStreamExt};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_IMAGES: usize = 50;
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(600);

/// Runs metadata extraction for upload batches. Built once, shared read-only.
pub struct MetadataPipeline {
    provider: Box<dyn VisionProvider>,
    prompt: String,
    encoding: ImageEncoding,
    sheet_name: String,
    max_images: usize,
    concurrency: usize,
    call_timeout: Duration,
    batch_timeout: Duration,
}

impl fmt::Debug for MetadataPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataPipeline")
            .field("provider", &self.provider)
            .field("encoding", &self.encoding.name())
            .field("sheet_name", &self.sheet_name)
            .field("max_images", &self.max_images)
            .field("concurrency", &self.concurrency)
            .field("call_timeout", &self.call_timeout)
            .field("batch_timeout", &self.batch_timeout)
            .finish_non_exhaustive()
    }
}

/// A builder for creating `MetadataPipeline` instances.
#[derive(Default)]
pub struct MetadataPipelineBuilder {
    provider: Option<Box<dyn VisionProvider>>,
    prompt: Option<String>,
    encoding: ImageEncoding,
    sheet_name: Option<String>,
    max_images: Option<usize>,
    concurrency: Option<usize>,
    call_timeout: Option<Duration>,
    batch_timeout: Option<Duration>,
}

impl MetadataPipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the vision provider. Required.
    pub fn provider(mut self, provider: Box<dyn VisionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Replaces the default instruction prompt.
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn encoding(mut self, encoding: ImageEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn sheet_name(mut self, sheet_name: impl Into<String>) -> Self {
        self.sheet_name = Some(sheet_name.into());
        self
    }

    pub fn max_images(mut self, max_images: usize) -> Self {
        self.max_images = Some(max_images);
        self
    }

    /// How many inference calls may be in flight at once. `1` is strictly sequential.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = Some(timeout);
        self
    }

    /// Builds the pipeline. Fails when no provider was set or the sheet name
    /// would be rejected by the xlsx writer.
    pub fn build(self) -> Result<MetadataPipeline, MetadataError> {
        let provider = self.provider.ok_or(MetadataError::MissingProvider)?;
        let sheet_name = self
            .sheet_name
            .unwrap_or_else(|| DEFAULT_SHEET_NAME.to_string());
        validate_sheet_name(&sheet_name)?;
        Ok(MetadataPipeline {
            provider,
            prompt: self
                .prompt
                .unwrap_or_else(|| STOCK_METADATA_PROMPT.to_string()),
            encoding: self.encoding,
            sheet_name,
            max_images: self.max_images.unwrap_or(DEFAULT_MAX_IMAGES),
            concurrency: self.concurrency.unwrap_or(DEFAULT_CONCURRENCY).max(1),
            call_timeout: self.call_timeout.unwrap_or(DEFAULT_CALL_TIMEOUT),
            batch_timeout: self.batch_timeout.unwrap_or(DEFAULT_BATCH_TIMEOUT),
        })
    }
}

impl MetadataPipeline {
    pub fn builder() -> MetadataPipelineBuilder {
        MetadataPipelineBuilder::new()
    }

    pub fn max_images(&self) -> usize {
        self.max_images
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Checks a batch before any inference call is made.
    pub fn validate(&self, images: &[UploadedImage]) -> Result<(), UploadError> {
        if images.is_empty() {
            return Err(UploadError::EmptyBatch);
        }
        if images.len() > self.max_images {
            return Err(UploadError::TooManyImages {
                count: images.len(),
                max: self.max_images,
            });
        }
        for (index, image) in images.iter().enumerate() {
            if image.filename.trim().is_empty() {
                return Err(UploadError::MissingFilename { index });
            }
            if image.is_empty() {
                return Err(UploadError::EmptyImage {
                    index,
                    filename: image.filename.clone(),
                });
            }
            if !image.content_type.starts_with("image/") {
                return Err(UploadError::UnsupportedContentType {
                    index,
                    filename: image.filename.clone(),
                    content_type: image.content_type.clone(),
                });
            }
        }
        Ok(())
    }

    /// Processes a whole batch into an `ExportDocument` with one row per image.
    pub async fn process(
        &self,
        images: Vec<UploadedImage>,
    ) -> Result<ExportDocument, MetadataError> {
        self.validate(&images)?;

        let started = Instant::now();
        let concurrency = self.concurrency.min(images.len());
        info!(
            images = images.len(),
            concurrency,
            encoding = self.encoding.name(),
            "Starting metadata batch"
        );

        let calls: Vec<_> = images
            .iter()
            .enumerate()
            .map(|(index, image)| self.extract_one(index, image))
            .collect();
        let rows = stream::iter(calls)
            .buffered(concurrency)
            .try_collect::<Vec<ResultRow>>();

        let rows = tokio::time::timeout(self.batch_timeout, rows)
            .await
            .map_err(|_| MetadataError::BatchTimeout {
                after: self.batch_timeout,
            })??;

        info!(
            rows = rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Metadata batch completed"
        );
        Ok(ExportDocument::new(self.sheet_name.clone(), rows))
    }

    /// Runs one image through inference and parsing.
    async fn extract_one(
        &self,
        index: usize,
        image: &UploadedImage,
    ) -> Result<ResultRow, MetadataError> {
        debug!(index, filename = %image.filename, size = image.len(), "Extracting metadata");

        let raw = self.infer(image).await.map_err(|failure| match failure {
            CallFailure::Inference(source) => MetadataError::Inference {
                index,
                filename: image.filename.clone(),
                source,
            },
            CallFailure::Timeout => MetadataError::CallTimeout {
                index,
                filename: image.filename.clone(),
                after: self.call_timeout,
            },
        })?;

        let metadata = parse_metadata(&raw).map_err(|source| MetadataError::Parse {
            index,
            filename: image.filename.clone(),
            raw: raw.clone(),
            source,
        })?;

        let keyword_count = metadata.keyword_count();
        if keyword_count != EXPECTED_KEYWORD_COUNT {
            warn!(
                index,
                filename = %image.filename,
                keyword_count,
                "Model returned an unexpected number of keywords"
            );
        }

        info!(index, filename = %image.filename, title = %metadata.title, "Extracted metadata");
        Ok(ResultRow::from_metadata(image.filename.clone(), metadata))
    }

    /// Encodes the image per the configured strategy and calls the provider.
    ///
    /// Only the provider call is bounded by `call_timeout`. A hosted image is
    /// released after its call, or from `HostedImage::drop` when the batch is
    /// cancelled mid-call.
    async fn infer(&self, image: &UploadedImage) -> Result<String, CallFailure> {
        match &self.encoding {
            ImageEncoding::Inline => self.call_provider(&ImagePayload::inline(image)).await,
            ImageEncoding::Reference(host) => {
                let url = host.publish(image).await.map_err(CallFailure::Inference)?;
                let hosted = HostedImage::new(Arc::clone(host), url);
                let result = self
                    .call_provider(&ImagePayload::hosted(hosted.url(), image))
                    .await;
                hosted.release().await;
                result
            }
        }
    }

    async fn call_provider(&self, payload: &ImagePayload) -> Result<String, CallFailure> {
        tokio::time::timeout(
            self.call_timeout,
            self.provider.describe_image(&self.prompt, payload),
        )
        .await
        .map_err(|_| CallFailure::Timeout)?
        .map_err(CallFailure::Inference)
    }
}

enum CallFailure {
    Inference(InferenceError),
    Timeout,
}

/// A published image that must be released exactly once.
///
/// Dropping it unreleased (a batch timeout, or the request going away) hands
/// the release to a background task.
struct HostedImage {
    host: Arc<dyn ImageHost>,
    url: String,
    released: bool,
}

impl HostedImage {
    fn new(host: Arc<dyn ImageHost>, url: String) -> Self {
        Self {
            host,
            url,
            released: false,
        }
    }

    fn url(&self) -> &str {
        &self.url
    }

    async fn release(mut self) {
        release_hosted(self.host.as_ref(), &self.url).await;
        self.released = true;
    }
}

impl Drop for HostedImage {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let host = Arc::clone(&self.host);
        let url = std::mem::take(&mut self.url);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!(url = %url, "Releasing hosted image of a cancelled call");
                handle.spawn(async move { release_hosted(host.as_ref(), &url).await });
            }
            Err(_) => warn!(url = %url, "No runtime left to release hosted image"),
        }
    }
}

async fn release_hosted(host: &dyn ImageHost, url: &str) {
    if let Err(e) = host.release(url).await {
        warn!(url = %url, "Failed to release hosted image: {e}");
    }
}
