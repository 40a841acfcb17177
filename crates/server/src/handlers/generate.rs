//! # Metadata Generation Handler
//!
//! Accepts a multipart batch of images under the repeated `images` field, runs
//! the extraction pipeline, and returns the spreadsheet as a download.

use crate::{errors::AppError, state::AppState, types::GenerateParams};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Multipart;
use stockmeta::{MetadataError, UploadError, UploadedImage};
use tracing::{info, warn};

/// The multipart field that carries the images.
pub const IMAGES_FIELD: &str = "images";

const OCTET_STREAM: &str = "application/octet-stream";

/// Handler for `POST /generate`.
pub async fn generate_handler(
    State(app_state): State<AppState>,
    params: Result<Query<GenerateParams>, QueryRejection>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let Query(params) =
        params.map_err(|e| AppError::BadRequest(format!("Invalid query: {}", e.body_text())))?;
    let max_images = app_state.pipeline.max_images();
    let mut images: Vec<UploadedImage> = Vec::new();

    // --- 1. Collect the uploads, stopping as soon as the batch is too large ---
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name != IMAGES_FIELD {
            warn!("Ignoring unknown multipart field: {}", name);
            continue;
        }
        if images.len() == max_images {
            return Err(UploadError::TooManyImages {
                count: images.len() + 1,
                max: max_images,
            }
            .into());
        }

        let filename = field.file_name().unwrap_or("").to_string();
        // Browsers send octet-stream for unknown types; fall back to the extension.
        let content_type = field
            .content_type()
            .filter(|ct| *ct != OCTET_STREAM)
            .map(str::to_string)
            .unwrap_or_else(|| {
                mime_guess::from_path(&filename)
                    .first_or_octet_stream()
                    .to_string()
            });
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload '{filename}': {e}")))?;

        info!(filename = %filename, content_type = %content_type, size = bytes.len(), "Received upload");
        images.push(UploadedImage::new(filename, content_type, bytes.to_vec()));
    }

    // --- 2. Run the batch ---
    let format = params.format.unwrap_or_default();
    info!(images = images.len(), %format, "Metadata generation requested");
    let document = app_state.pipeline.process(images).await?;
    let bytes = document.render(format).map_err(MetadataError::from)?;

    // --- 3. Deliver the file ---
    let download_name = format!(
        "{}.{}",
        app_state.config.export.file_stem,
        format.extension()
    );
    info!(rows = document.len(), bytes = bytes.len(), file = %download_name, "Sending export");

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{download_name}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}
