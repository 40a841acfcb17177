use std::time::Duration;
use thiserror::Error;

/// Reasons an upload batch is rejected before any inference call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("No images were uploaded")]
    EmptyBatch,
    #[error("Too many images: {count} uploaded, at most {max} allowed")]
    TooManyImages { count: usize, max: usize },
    #[error("Image #{index} has no filename")]
    MissingFilename { index: usize },
    #[error("Image #{index} ('{filename}') is empty")]
    EmptyImage { index: usize, filename: String },
    #[error("Image #{index} ('{filename}') has unsupported content type '{content_type}'")]
    UnsupportedContentType {
        index: usize,
        filename: String,
        content_type: String,
    },
}

/// Errors raised while talking to a vision-language inference service.
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("Failed to send request to AI provider: {0}")]
    Request(reqwest::Error),
    #[error("Failed to deserialize AI provider response: {0}")]
    Deserialization(reqwest::Error),
    #[error("AI provider returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("AI provider returned no content")]
    EmptyResponse,
    #[error("Failed to host image for the AI provider: {0}")]
    ImageHost(String),
}

/// Errors raised while rendering the export document.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to build xlsx workbook: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("Failed to write csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to flush csv buffer: {0}")]
    CsvFlush(String),
}

/// The top-level error for a batch run. Any variant aborts the whole batch.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("A vision provider is required to build the pipeline")]
    MissingProvider,
    #[error("Upload rejected: {0}")]
    Upload(#[from] UploadError),
    #[error("Inference failed for image #{index} ('{filename}'): {source}")]
    Inference {
        index: usize,
        filename: String,
        #[source]
        source: InferenceError,
    },
    #[error("Could not parse metadata for image #{index} ('{filename}'): {source}. Raw response: {raw}")]
    Parse {
        index: usize,
        filename: String,
        raw: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Inference for image #{index} ('{filename}') timed out after {after:?}")]
    CallTimeout {
        index: usize,
        filename: String,
        after: Duration,
    },
    #[error("Batch timed out after {after:?}")]
    BatchTimeout { after: Duration },
    #[error("Export failed: {0}")]
    Export(#[from] ExportError),
}

impl MetadataError {
    /// The position of the image that caused the failure, when one did.
    pub fn image_index(&self) -> Option<usize> {
        match self {
            MetadataError::Inference { index, .. }
            | MetadataError::Parse { index, .. }
            | MetadataError::CallTimeout { index, .. } => Some(*index),
            MetadataError::Upload(
                UploadError::MissingFilename { index }
                | UploadError::EmptyImage { index, .. }
                | UploadError::UnsupportedContentType { index, .. },
            ) => Some(*index),
            _ => None,
        }
    }
}
