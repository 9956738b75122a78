//! Authentication Handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::AppState;

use super::error::{AuthError, AuthResult};
use super::middleware::AuthUser;

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Seconds until the token expires.
    pub expires_in: i64,
}

/// Login with username/password.
///
/// POST /login
#[tracing::instrument(skip(state, body), fields(username = %body.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AuthResult<Json<LoginResponse>> {
    if body.username.is_empty() || body.password.is_empty() {
        return Err(AuthError::Validation(
            "username and password are required".to_string(),
        ));
    }

    let user = state
        .users
        .authenticate(&body.username, &body.password)
        .ok_or_else(|| {
            tracing::warn!("Login failed");
            AuthError::InvalidCredentials
        })?;

    let token = state.jwt.issue(&user.username, user.role)?;
    tracing::info!(role = %user.role, "Login succeeded");

    Ok(Json(LoginResponse {
        access_token: token.token,
        token_type: "Bearer",
        expires_in: token.expires_in,
    }))
}

/// Public area.
///
/// GET /public
pub async fn public_area() -> &'static str {
    "This is a public endpoint accessible to everyone."
}

/// User area (user or admin role).
///
/// GET /user
pub async fn user_area(auth_user: AuthUser) -> String {
    format!("Hello {}, welcome to the user area.", auth_user.subject())
}

/// Admin area (admin role).
///
/// GET /admin
pub async fn admin_area(auth_user: AuthUser) -> String {
    format!("Hello {}, welcome to the admin area.", auth_user.subject())
}
