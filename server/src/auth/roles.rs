//! Role-based access control.

use std::fmt;

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::error::AuthError;
use super::jwt::Claims;
use super::middleware::AuthUser;

/// Roles a token can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Admin => f.write_str("admin"),
        }
    }
}

/// Roles allowed into the user area.
pub const USER_AREA_ROLES: &[Role] = &[Role::User, Role::Admin];

/// Roles allowed into the admin area.
pub const ADMIN_AREA_ROLES: &[Role] = &[Role::Admin];

/// Why a decision came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonCode {
    RoleGranted,
    RoleNotPermitted,
}

/// Result of one authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationDecision {
    pub allowed: bool,
    pub reason: ReasonCode,
}

/// Allow iff the claimed role is one of `required`.
pub fn authorize(claims: &Claims, required: &[Role]) -> AuthorizationDecision {
    if required.contains(&claims.role) {
        AuthorizationDecision {
            allowed: true,
            reason: ReasonCode::RoleGranted,
        }
    } else {
        AuthorizationDecision {
            allowed: false,
            reason: ReasonCode::RoleNotPermitted,
        }
    }
}

/// Middleware gating a route on a set of roles.
///
/// Must run after [`super::require_auth`]; a request without an
/// authenticated user is rejected as unauthenticated.
///
/// # Usage
///
/// ```ignore
/// Router::new()
///     .route("/admin", get(handler).layer(from_fn(require_roles(ADMIN_AREA_ROLES))))
///     .layer(from_fn_with_state(state, require_auth))
/// ```
pub fn require_roles(
    required: &'static [Role],
) -> impl Fn(Request, Next) -> std::pin::Pin<Box<dyn std::future::Future<Output = Response> + Send>>
       + Clone
       + Send
       + 'static {
    move |request: Request, next: Next| {
        Box::pin(async move {
            let Some(user) = request.extensions().get::<AuthUser>() else {
                return AuthError::MissingToken.into_response();
            };

            let decision = authorize(&user.claims, required);
            if !decision.allowed {
                tracing::warn!(
                    subject = %user.subject(),
                    role = %user.role(),
                    reason = ?decision.reason,
                    "Role not permitted"
                );
                return AuthError::Forbidden.into_response();
            }

            next.run(request).await
        })
    }
}
