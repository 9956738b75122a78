//! Upload Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use super::metadata::ProcessingError;
use super::path::PathError;
use crate::util::format_file_size;

/// Errors that can occur while accepting an avatar upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// No `avatar` field in the form.
    #[error("No file uploaded")]
    NoFile,

    /// File too large.
    #[error("File too large (max: {max_size} bytes)")]
    TooLarge {
        /// Maximum allowed size in bytes.
        max_size: usize,
    },

    /// Declared MIME type is not allow-listed.
    #[error("Invalid file type")]
    InvalidMimeType {
        /// The rejected MIME type (logged, never returned to clients).
        mime_type: String,
    },

    /// Filename extension is missing or not allow-listed.
    #[error("Invalid file extension")]
    InvalidExtension,

    /// Sniffed content disagrees with the policy or the declared type.
    ///
    /// Raised even when both types are allow-listed: a valid JPEG declared
    /// as `image/png` (or named `.png`) is rejected.
    #[error("Invalid file type")]
    ContentMismatch {
        /// The type the client declared.
        declared: String,
        /// The type detected from magic bytes, if any.
        detected: Option<String>,
    },

    /// The storage path failed containment checks.
    #[error("Invalid file path")]
    PathTraversal,

    /// The storage path could not be decoded.
    #[error("Invalid file path")]
    Decode,

    /// Malformed multipart body.
    #[error("Malformed upload: {0}")]
    Malformed(String),

    /// Re-encoding the image failed.
    #[error("Unable to process file")]
    Processing(#[from] ProcessingError),

    /// Disk or task failure while persisting.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<PathError> for UploadError {
    fn from(err: PathError) -> Self {
        match err {
            PathError::Decode => Self::Decode,
            PathError::Traversal | PathError::NullByte | PathError::Unresolvable => {
                Self::PathTraversal
            }
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            Self::NoFile => (StatusCode::BAD_REQUEST, "NO_FILE", self.to_string()),
            Self::TooLarge { max_size } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "FILE_TOO_LARGE",
                format!("File too large. Maximum size is {}", format_file_size(*max_size)),
            ),
            Self::InvalidMimeType { .. }
            | Self::InvalidExtension
            | Self::ContentMismatch { .. } => (
                StatusCode::BAD_REQUEST,
                "INVALID_FILE_TYPE",
                self.to_string(),
            ),
            Self::PathTraversal | Self::Decode => {
                (StatusCode::BAD_REQUEST, "INVALID_PATH", self.to_string())
            }
            Self::Malformed(_) => (
                StatusCode::BAD_REQUEST,
                "MALFORMED_UPLOAD",
                "Malformed upload".to_string(),
            ),
            Self::Processing(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PROCESSING_ERROR",
                "Unable to process file".to_string(),
            ),
            Self::Storage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                "Storage operation failed".to_string(),
            ),
        };

        let body = Json(serde_json::json!({
            "error": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}
