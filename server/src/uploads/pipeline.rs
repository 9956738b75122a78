//! Avatar validation pipeline.
//!
//! Runs the declared-type check, content sniffing, path containment and
//! metadata stripping in order. Nothing touches disk until all four pass.

use std::path::Path;

use serde::Serialize;
use tokio::task::JoinError;
use uuid::Uuid;

use super::error::UploadError;
use super::metadata::strip_metadata;
use super::path::resolve_within_root;
use super::policy::AllowListPolicy;
use super::sniff::verify_content;

/// An upload held in memory while it is validated.
#[derive(Debug)]
pub struct UploadCandidate {
    /// MIME type from the multipart part header (or guessed from the filename).
    pub declared_mime_type: String,
    /// Filename exactly as the client sent it.
    pub original_filename: String,
    pub raw_bytes: Vec<u8>,
    /// `Content-Length` of the part, when the client sent one.
    pub declared_size_bytes: Option<u64>,
}

/// A persisted avatar.
#[derive(Debug, Clone, Serialize)]
pub struct StoredAvatar {
    /// Generated filename: random UUID plus the original extension.
    pub filename: String,
    /// Sniffed MIME type.
    pub mime_type: String,
    /// Size in bytes after metadata stripping.
    pub size: usize,
}

/// Validate `candidate` and write it under `upload_root`.
#[tracing::instrument(
    skip(policy, candidate),
    fields(original_filename = %candidate.original_filename, size = candidate.raw_bytes.len())
)]
pub async fn process_upload(
    policy: &AllowListPolicy,
    upload_root: &Path,
    candidate: UploadCandidate,
) -> Result<StoredAvatar, UploadError> {
    if candidate.raw_bytes.len() > policy.max_size_bytes() {
        return Err(UploadError::TooLarge {
            max_size: policy.max_size_bytes(),
        });
    }

    let extension = policy
        .check_declared(&candidate.declared_mime_type, &candidate.original_filename)
        .inspect_err(|e| {
            tracing::warn!(
                declared_mime = %candidate.declared_mime_type,
                error = ?e,
                "Declared file type rejected"
            );
        })?;

    let detected = verify_content(
        policy,
        &candidate.raw_bytes,
        &candidate.declared_mime_type,
        &extension,
    )?;
    tracing::debug!(detected_mime = %detected, "Content signature verified");

    let filename = format!("{}{}", Uuid::new_v4(), extension);
    let final_path = resolve_within_root(upload_root, &filename)?;

    let raw_bytes = candidate.raw_bytes;
    let processed = tokio::task::spawn_blocking(move || strip_metadata(&raw_bytes, detected))
        .await
        .map_err(metadata_task_failed)?
        .inspect_err(|e| tracing::error!(error = %e, "Metadata stripping failed"))?;

    if let Err(e) = tokio::fs::write(&final_path, &processed).await {
        tracing::error!(
            path = %final_path.display(),
            error = %e,
            "Failed to write avatar"
        );
        // Never leave a truncated file behind.
        let _ = tokio::fs::remove_file(&final_path).await;
        return Err(UploadError::Storage(e.to_string()));
    }

    tracing::info!(filename = %filename, mime_type = %detected, "Avatar stored");

    Ok(StoredAvatar {
        filename,
        mime_type: detected.to_string(),
        size: processed.len(),
    })
}

/// The blocking task panicked or was cancelled.
fn metadata_task_failed(err: JoinError) -> UploadError {
    tracing::error!(error = %err, "Metadata stripping task failed");
    UploadError::Storage(format!("metadata task failed: {err}"))
}
