//! # Core Data Types
//!
//! The records that flow through a batch: the uploaded image, the metadata the
//! model extracts for it, the exported row, and the finished document.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The header row of every export, in column order.
pub const COLUMN_HEADERS: [&str; 4] = ["Filename", "Title", "Description", "Keywords"];

/// The sheet name used when none is configured.
pub const DEFAULT_SHEET_NAME: &str = "AdobeStock";

/// A single image received from the caller. Lives for one request only.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedImage {
    /// The filename exactly as supplied by the caller.
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// Image bytes are omitted so batches can be logged with `?`.
impl fmt::Debug for UploadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedImage")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// The JSON object the model is asked to return for each image.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExtractedMetadata {
    pub title: String,
    pub description: String,
    /// Comma-separated, most relevant first.
    pub keywords: String,
}

impl ExtractedMetadata {
    /// Splits the keyword string into trimmed, non-empty terms.
    pub fn keyword_list(&self) -> Vec<&str> {
        self.keywords
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .collect()
    }

    pub fn keyword_count(&self) -> usize {
        self.keyword_list().len()
    }
}

/// One exported record. Field names double as the export's header row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResultRow {
    #[serde(rename = "Filename")]
    pub filename: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Keywords")]
    pub keywords: String,
}

impl ResultRow {
    /// Builds a row from the parsed metadata, keeping the filename verbatim.
    pub fn from_metadata(filename: impl Into<String>, metadata: ExtractedMetadata) -> Self {
        Self {
            filename: filename.into(),
            title: metadata.title,
            description: metadata.description,
            keywords: metadata.keywords,
        }
    }

    /// The cell values in `COLUMN_HEADERS` order.
    pub fn cells(&self) -> [&str; 4] {
        [&self.filename, &self.title, &self.description, &self.keywords]
    }
}

/// A single-sheet table: header row plus one row per image, in upload order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub sheet_name: String,
    pub rows: Vec<ResultRow>,
}

impl ExportDocument {
    pub fn new(sheet_name: impl Into<String>, rows: Vec<ResultRow>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
