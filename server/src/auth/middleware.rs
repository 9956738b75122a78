//! Authentication Middleware

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::api::AppState;

use super::error::AuthError;
use super::jwt::Claims;
use super::roles::Role;

/// Authenticated caller injected into request extensions.
///
/// Holds claims that passed signature, algorithm and expiry checks.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub claims: Claims,
}

impl AuthUser {
    pub fn subject(&self) -> &str {
        &self.claims.sub
    }

    pub const fn role(&self) -> Role {
        self.claims.role
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self { claims }
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
///
/// A missing header, another scheme, or an empty token all count as absent.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Middleware to require authentication.
///
/// Extracts the Bearer token from the Authorization header, verifies it, and
/// injects `AuthUser` into request extensions. An absent token is a 401; a
/// token that fails verification is a 403.
///
/// # Usage
///
/// Apply to routes that require authentication:
/// ```ignore
/// Router::new()
///     .route("/protected", get(handler))
///     .layer(axum::middleware::from_fn_with_state(state, require_auth))
/// ```
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = bearer_token(header).ok_or(AuthError::MissingToken)?;

    let claims = state.jwt.verify(token).inspect_err(|e| {
        tracing::warn!(error = %e, "Rejected bearer token");
    })?;

    request.extensions_mut().insert(AuthUser::from(claims));

    Ok(next.run(request).await)
}

/// Extractor for authenticated user in handlers.
///
/// ```ignore
/// async fn protected_handler(auth_user: AuthUser) -> impl IntoResponse {
///     format!("Hello, {}!", auth_user.subject())
/// }
/// ```
impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}
