//! # Image Encoding
//!
//! How an uploaded image is handed to the inference service: either inline as a
//! base64 data URI, or by reference through a URL the service fetches itself.

use crate::{errors::InferenceError, types::UploadedImage};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use std::fmt::Debug;
use std::sync::Arc;

/// The image part of a single inference request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    /// Base64-encoded bytes embedded in the request.
    Inline { mime_type: String, data: String },
    /// A URL the inference service can download the image from.
    Url { url: String, mime_type: String },
}

impl ImagePayload {
    pub fn inline(image: &UploadedImage) -> Self {
        ImagePayload::Inline {
            mime_type: image.content_type.clone(),
            data: general_purpose::STANDARD.encode(&image.bytes),
        }
    }

    pub fn hosted(url: impl Into<String>, image: &UploadedImage) -> Self {
        ImagePayload::Url {
            url: url.into(),
            mime_type: image.content_type.clone(),
        }
    }

    /// The content type of the image behind the payload.
    pub fn mime_type(&self) -> &str {
        match self {
            ImagePayload::Inline { mime_type, .. } | ImagePayload::Url { mime_type, .. } => {
                mime_type
            }
        }
    }

    /// The payload as a single URL: a `data:` URI for inline payloads.
    pub fn as_url(&self) -> String {
        match self {
            ImagePayload::Inline { mime_type, data } => format!("data:{mime_type};base64,{data}"),
            ImagePayload::Url { url, .. } => url.clone(),
        }
    }
}

/// Makes uploaded images reachable over HTTP for by-reference encoding.
#[async_trait]
pub trait ImageHost: Send + Sync + Debug {
    /// Stores the image and returns the public URL it can be fetched from.
    async fn publish(&self, image: &UploadedImage) -> Result<String, InferenceError>;

    /// Removes a previously published image.
    async fn release(&self, url: &str) -> Result<(), InferenceError>;
}

/// The encoding strategy of a pipeline. One per deployment.
#[derive(Debug, Clone, Default)]
pub enum ImageEncoding {
    #[default]
    Inline,
    Reference(Arc<dyn ImageHost>),
}

impl ImageEncoding {
    pub fn name(&self) -> &'static str {
        match self {
            ImageEncoding::Inline => "inline",
            ImageEncoding::Reference(_) => "reference",
        }
    }
}
