//! Product image uploads.
//!
//! Images are written to `{UPLOAD_DIR}/temp_images/` and served back from
//! `/uploads/temp_images/`.

use std::io::ErrorKind;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const ALLOWED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];
pub const TEMP_IMAGES_DIR: &str = "temp_images";
pub const PUBLIC_PREFIX: &str = "/uploads";

/// Errors from validating or saving an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No image file provided.")]
    MissingFile,

    #[error("Invalid file type: {0}. Allowed types: {types}", types = ALLOWED_MIME_TYPES.join(", "))]
    InvalidType(String),

    #[error("File too large ({}MB). Max size is 5MB.", megabytes(.0))]
    TooLarge(usize),

    #[error("Permission denied when trying to save the image.")]
    PermissionDenied,

    #[error("Not enough disk space to save the image.")]
    DiskFull,

    #[error("Image upload failed due to an internal server error.")]
    Io(#[source] std::io::Error),
}

impl UploadError {
    /// Whether the client sent something unacceptable.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingFile | Self::InvalidType(_) | Self::TooLarge(_)
        )
    }
}

impl From<std::io::Error> for UploadError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            ErrorKind::PermissionDenied => Self::PermissionDenied,
            ErrorKind::StorageFull => Self::DiskFull,
            _ => Self::Io(e),
        }
    }
}

#[allow(clippy::cast_precision_loss, clippy::trivially_copy_pass_by_ref)]
fn megabytes(bytes: &usize) -> String {
    format!("{:.2}", *bytes as f64 / (1024.0 * 1024.0))
}

/// A saved image.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    pub image_url: String,
    pub message: &'static str,
}

/// Check type and size before touching the disk.
///
/// # Errors
///
/// Returns `UploadError::InvalidType` or `UploadError::TooLarge`.
pub fn validate(content_type: &str, len: usize) -> Result<(), UploadError> {
    if !ALLOWED_MIME_TYPES.contains(&content_type) {
        return Err(UploadError::InvalidType(content_type.to_owned()));
    }
    if len > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge(len));
    }
    Ok(())
}

/// Replace anything outside `[A-Za-z0-9._-]` with `_`.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim_matches('.').is_empty() {
        "image".to_owned()
    } else {
        sanitized
    }
}

/// The on-disk name: epoch milliseconds, then the sanitized original name.
#[must_use]
pub fn stored_name(original: &str, epoch_millis: i64) -> String {
    format!("{epoch_millis}-{}", sanitize_filename(original))
}

/// Validate and write an uploaded image.
///
/// # Errors
///
/// Returns `UploadError` for a rejected file or a failed write.
pub async fn save_image(
    upload_dir: &Path,
    original_name: &str,
    content_type: &str,
    bytes: &[u8],
) -> Result<StoredImage, UploadError> {
    validate(content_type, bytes.len())?;

    let dir = upload_dir.join(TEMP_IMAGES_DIR);
    let file_name = stored_name(original_name, Utc::now().timestamp_millis());

    let write = async {
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&file_name), bytes).await
    };
    if let Err(e) = write.await {
        error!(error = %e, file_name = %file_name, "Failed to save uploaded image");
        return Err(e.into());
    }

    info!(file_name = %file_name, size = bytes.len(), "Image uploaded");
    Ok(StoredImage {
        image_url: format!("{PUBLIC_PREFIX}/{TEMP_IMAGES_DIR}/{file_name}"),
        message: "Image uploaded successfully.",
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("my photo (1).png"), "my_photo__1_.png");
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename("ok-name_2.jpg"), "ok-name_2.jpg");
        assert_eq!(sanitize_filename(".."), "image");
        assert_eq!(sanitize_filename(""), "image");
    }

    #[test]
    fn test_stored_name_prefixes_timestamp() {
        assert_eq!(stored_name("a b.gif", 1_700_000_000_000), "1700000000000-a_b.gif");
    }

    #[test]
    fn test_validate_type_and_size() {
        assert!(validate("image/png", 10).is_ok());
        assert!(validate("image/png", MAX_UPLOAD_BYTES).is_ok());

        let err = validate("application/pdf", 10).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid file type: application/pdf. Allowed types: image/jpeg, image/png, image/webp, image/gif"
        );

        let err = validate("image/jpeg", 6 * 1024 * 1024).unwrap_err();
        assert_eq!(err.to_string(), "File too large (6.00MB). Max size is 5MB.");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_io_errors_map_to_messages() {
        let denied: UploadError = std::io::Error::from(ErrorKind::PermissionDenied).into();
        let full: UploadError = std::io::Error::from(ErrorKind::StorageFull).into();
        assert_eq!(
            denied.to_string(),
            "Permission denied when trying to save the image."
        );
        assert_eq!(full.to_string(), "Not enough disk space to save the image.");
        assert!(!full.is_client_error());
    }

    #[tokio::test]
    async fn test_save_image_writes_file() {
        let dir = std::env::temp_dir().join(format!("sellor-upload-{}", uuid::Uuid::new_v4()));

        let stored = save_image(&dir, "mug.png", "image/png", b"\x89PNG")
            .await
            .unwrap();

        let name = stored.image_url.rsplit('/').next().unwrap();
        assert!(stored.image_url.starts_with("/uploads/temp_images/"));
        assert!(name.ends_with("-mug.png"));
        let written = std::fs::read(dir.join(TEMP_IMAGES_DIR).join(name)).unwrap();
        assert_eq!(written, b"\x89PNG");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
