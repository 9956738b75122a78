//! Authentication Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Authentication and authorization error types.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid credentials (wrong username/password).
    #[error("Username or password incorrect")]
    InvalidCredentials,

    /// No bearer token on the request.
    #[error("Missing authorization token")]
    MissingToken,

    /// Signature, algorithm, or claims failed verification.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Token has expired.
    #[error("Invalid or expired token")]
    TokenExpired,

    /// Authenticated, but the role is not permitted here.
    #[error("Insufficient role")]
    Forbidden,

    /// Validation error.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Internal server error.
    #[error("Internal server error")]
    Internal(String),
}

/// Error response body for JSON responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            Self::MissingToken => (StatusCode::UNAUTHORIZED, "MISSING_AUTH"),
            Self::InvalidToken => (StatusCode::FORBIDDEN, "INVALID_TOKEN"),
            Self::TokenExpired => (StatusCode::FORBIDDEN, "TOKEN_EXPIRED"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::Internal(detail) => {
                tracing::error!(detail = %detail, "Internal authentication error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let body = Json(ErrorResponse {
            error: code.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;
