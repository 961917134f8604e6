//! Product image upload handler.

use axum::{
    Json,
    extract::{Multipart, State},
};
use tracing::{instrument, warn};

use crate::error::{AppError, Result};
use crate::middleware::RequireVendor;
use crate::services::uploads::{self, StoredImage, UploadError};
use crate::state::AppState;

/// Multipart field carrying the file.
const IMAGE_FIELD: &str = "image";

/// Request body cap for the upload route. Larger than the image limit so
/// oversized files get a size message instead of a dropped connection.
pub const UPLOAD_BODY_LIMIT: usize = 2 * uploads::MAX_UPLOAD_BYTES;

/// `POST /api/upload-image`
#[instrument(skip_all, fields(vendor_id = %vendor.vendor_id))]
pub async fn upload_image(
    State(state): State<AppState>,
    vendor: RequireVendor,
    mut multipart: Multipart,
) -> Result<Json<StoredImage>> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!(error = %e, "Malformed multipart body");
        AppError::BadRequest(e.body_text())
    })? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("image").to_owned();
        let content_type = field.content_type().unwrap_or_default().to_owned();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let stored = uploads::save_image(
            &state.config().upload_dir,
            &file_name,
            &content_type,
            &bytes,
        )
        .await?;
        return Ok(Json(stored));
    }

    Err(UploadError::MissingFile.into())
}
