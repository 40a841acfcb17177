use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use stockmeta::{MetadataError, UploadError};
use tracing::{error, warn};

/// The only failure message callers see, whatever went wrong.
pub const GENERATION_FAILED: &str = "Metadata generation failed";

/// A custom error type for the server application.
///
/// The status code separates the caller's mistakes (400) from ours (500). The
/// body is always `GENERATION_FAILED`; the detail goes to the log.
#[derive(Debug)]
pub enum AppError {
    /// The request's upload batch was malformed or too large.
    Upload(UploadError),
    /// The multipart body or query string could not be read.
    BadRequest(String),
    /// Errors originating from the `stockmeta` pipeline.
    Metadata(MetadataError),
    /// Generic internal server errors.
    Internal(anyhow::Error),
}

impl From<MetadataError> for AppError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::Upload(e) => AppError::Upload(e),
            other => AppError::Metadata(other),
        }
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        AppError::Upload(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = match self {
            AppError::Upload(err) => {
                warn!("Upload rejected: {err}");
                StatusCode::BAD_REQUEST
            }
            AppError::BadRequest(msg) => {
                warn!("Bad request: {msg}");
                StatusCode::BAD_REQUEST
            }
            AppError::Metadata(err) => {
                error!(image_index = ?err.image_index(), "Metadata generation failed: {err}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Internal(err) => {
                error!("Internal server error: {:?}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": GENERATION_FAILED,
        }));

        (status_code, body).into_response()
    }
}
