//! Avatar upload handler.

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, State};
use axum::http::header::CONTENT_LENGTH;
use axum::http::StatusCode;
use axum::Json;

use super::error::UploadError;
use super::pipeline::{process_upload, StoredAvatar, UploadCandidate};
use crate::api::AppState;
use crate::auth::AuthUser;

/// Multipart field carrying the avatar image.
pub const AVATAR_FIELD: &str = "avatar";

/// Upload an avatar image.
///
/// POST /upload-avatar
///
/// Expects a multipart form with a single `avatar` file field.
#[tracing::instrument(skip(state, auth_user, multipart), fields(subject = %auth_user.subject()))]
pub async fn upload_avatar(
    State(state): State<AppState>,
    auth_user: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StoredAvatar>), UploadError> {
    let max_size = state.policy.max_size_bytes();
    let mut candidate: Option<UploadCandidate> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_size))?
    {
        if field.name() != Some(AVATAR_FIELD) || candidate.is_some() {
            continue;
        }
        candidate = Some(read_candidate(field, max_size).await?);
    }

    let candidate = candidate.ok_or(UploadError::NoFile)?;
    let stored = process_upload(&state.policy, &state.config.upload_dir, candidate).await?;

    Ok((StatusCode::CREATED, Json(stored)))
}

/// Buffer one file field, stopping as soon as it exceeds `max_size`.
async fn read_candidate(
    mut field: Field<'_>,
    max_size: usize,
) -> Result<UploadCandidate, UploadError> {
    let original_filename = field.file_name().ok_or(UploadError::NoFile)?.to_string();

    let declared_mime_type = field
        .content_type()
        .map(String::from)
        .or_else(|| {
            mime_guess::from_path(&original_filename)
                .first()
                .map(|m| m.essence_str().to_string())
        })
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let declared_size_bytes = field
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    if declared_size_bytes.is_some_and(|size| size > max_size as u64) {
        return Err(UploadError::TooLarge { max_size });
    }

    let mut raw_bytes = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, max_size))?
    {
        if raw_bytes.len() + chunk.len() > max_size {
            tracing::warn!(max_size, "Upload exceeded size limit");
            return Err(UploadError::TooLarge { max_size });
        }
        raw_bytes.extend_from_slice(&chunk);
    }

    Ok(UploadCandidate {
        declared_mime_type,
        original_filename,
        raw_bytes,
        declared_size_bytes,
    })
}

/// Body-limit failures surface as multipart errors with a 413 status.
fn multipart_error(err: MultipartError, max_size: usize) -> UploadError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return UploadError::TooLarge { max_size };
    }
    UploadError::Malformed(err.body_text())
}
