//! # Stock Image Metadata Extraction
//!
//! This crate turns a batch of uploaded images into stock-catalog metadata. Each
//! image is sent to a vision-language model with a fixed prompt, the JSON reply
//! is parsed into a title, description, and keyword list, and the rows are
//! assembled into a single-sheet spreadsheet in upload order.

pub mod encoding;
pub mod errors;
pub mod export;
pub mod parse;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod types;

pub use encoding::{ImageEncoding, ImageHost, ImagePayload};
pub use errors::{ExportError, InferenceError, MetadataError, UploadError};
pub use export::ExportFormat;
pub use pipeline::{MetadataPipeline, MetadataPipelineBuilder};
pub use types::{ExportDocument, ExtractedMetadata, ResultRow, UploadedImage};
