//! Avatar Upload Service
//!
//! Validates avatar uploads in layers before anything is written to disk:
//! declared type and extension, magic byte sniffing, path containment, and
//! metadata stripping.

mod error;
mod handlers;
pub mod metadata;
pub mod path;
mod pipeline;
pub mod policy;
pub mod sniff;

use axum::{middleware::from_fn_with_state, routing::post, Router};

use crate::api::AppState;
use crate::auth::require_auth;

pub use error::UploadError;
pub use handlers::AVATAR_FIELD;
pub use path::{is_path_safe, PathError, SanitizedPath};
pub use pipeline::{process_upload, StoredAvatar, UploadCandidate};
pub use policy::AllowListPolicy;

/// Create upload router.
///
/// Protected routes (auth required):
/// - POST /upload-avatar - Upload an avatar image
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/upload-avatar", post(handlers::upload_avatar))
        .layer(from_fn_with_state(state, require_auth))
}
