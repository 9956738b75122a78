//! Authentication Service
//!
//! Issues HS256 access tokens on login and gates protected routes on a
//! verified token plus a required role set.

mod error;
mod handlers;
pub mod jwt;
mod middleware;
pub mod roles;
pub mod users;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};

use crate::api::AppState;

pub use error::{AuthError, AuthResult};
pub use jwt::{Claims, JwtKeys};
pub use middleware::{bearer_token, require_auth, AuthUser};
pub use roles::{authorize, require_roles, AuthorizationDecision, ReasonCode, Role};
pub use users::{UserDirectory, UserRecord};

/// Create authentication router.
///
/// Public routes (no auth required):
/// - POST /login - Login with username/password
/// - GET /public - Public area
///
/// Protected routes (auth required):
/// - GET /user - User area (user or admin)
/// - GET /admin - Admin area (admin only)
pub fn router(state: AppState) -> Router<AppState> {
    let public_routes = Router::new()
        .route("/login", post(handlers::login))
        .route("/public", get(handlers::public_area));

    let protected_routes = Router::new()
        .route(
            "/user",
            get(handlers::user_area).layer(from_fn(require_roles(roles::USER_AREA_ROLES))),
        )
        .route(
            "/admin",
            get(handlers::admin_area).layer(from_fn(require_roles(roles::ADMIN_AREA_ROLES))),
        )
        .layer(from_fn_with_state(state, require_auth));

    public_routes.merge(protected_routes)
}
