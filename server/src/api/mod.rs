//! API Router and Application State
//!
//! Central routing configuration and shared state.

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, http::HeaderValue, routing::get, Json, Router};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::{
    auth::{self, AuthResult, JwtKeys, UserDirectory},
    config::Config,
    uploads::{self, AllowListPolicy},
};

/// Headroom above the file limit for multipart boundaries and part headers.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state.
///
/// Everything here is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// Upload allow-list
    pub policy: Arc<AllowListPolicy>,
    /// Token signing and verification keys
    pub jwt: Arc<JwtKeys>,
    /// Static user directory
    pub users: Arc<UserDirectory>,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: Config, users: UserDirectory) -> AuthResult<Self> {
        let policy = AllowListPolicy::from_config(&config);
        let jwt = JwtKeys::from_config(&config)?;

        Ok(Self {
            config: Arc::new(config),
            policy: Arc::new(policy),
            jwt: Arc::new(jwt),
            users: Arc::new(users),
        })
    }
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.policy.max_size_bytes() + MULTIPART_OVERHEAD;

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Login, public, user and admin areas
        .merge(auth::router(state.clone()))
        // Avatar uploads
        .merge(uploads::router(state.clone()))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'none'"),
        ))
        // State
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    /// Service status
    status: &'static str,
}

/// Health check endpoint.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
