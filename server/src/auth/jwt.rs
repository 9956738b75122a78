//! JWT Token Generation and Validation
//!
//! Access tokens are signed under a shared secret with the configured HMAC
//! algorithm. Verification pins that one algorithm: a token whose header
//! names any other, including `none`, is rejected before its claims are
//! looked at.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::error::{AuthError, AuthResult};
use super::roles::Role;
use crate::config::{Config, MAX_ACCESS_EXPIRY};

/// JWT claims for access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username).
    pub sub: String,
    /// Role used for authorization.
    pub role: Role,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
}

/// Signed access token returned after login.
#[derive(Debug)]
pub struct AccessToken {
    pub token: String,
    /// Validity in seconds.
    pub expires_in: i64,
}

/// Signing and verification keys, built once at startup.
#[derive(Clone)]
pub struct JwtKeys {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_expiry: i64,
}

impl JwtKeys {
    /// Build keys from a shared secret.
    ///
    /// `algorithm` is the only one tokens are signed and accepted with.
    /// `access_expiry_seconds` is clamped to 15 minutes.
    pub fn new(
        secret: &str,
        algorithm: Algorithm,
        access_expiry_seconds: i64,
    ) -> AuthResult<Self> {
        if secret.is_empty() {
            return Err(AuthError::Internal("JWT secret is empty".to_string()));
        }
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(AuthError::Internal(format!(
                "{algorithm:?} is not a shared-secret algorithm"
            )));
        }

        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;
        validation.leeway = 0;

        Ok(Self {
            algorithm,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_expiry: access_expiry_seconds.clamp(1, MAX_ACCESS_EXPIRY),
        })
    }

    pub fn from_config(config: &Config) -> AuthResult<Self> {
        Self::new(
            &config.jwt_secret,
            config.jwt_algorithm,
            config.jwt_access_expiry,
        )
    }

    /// Issue an access token for `subject` carrying `role`.
    pub fn issue(&self, subject: &str, role: Role) -> AuthResult<AccessToken> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.access_expiry)).timestamp(),
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("Token signing failed: {e}")))?;

        Ok(AccessToken {
            token,
            expires_in: self.access_expiry,
        })
    }

    /// Validate and decode an access token.
    ///
    /// Returns an error if the signature, algorithm, or expiry check fails.
    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        let token_data =
            decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                kind => {
                    tracing::debug!(?kind, "Token verification failed");
                    AuthError::InvalidToken
                }
            })?;

        // The library accepts exp == now; the token must still be strictly live.
        if token_data.claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::TokenExpired);
        }

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    const SECRET: &str = "unit-test-secret";

    /// Decode claims the way a broken verifier would: no signature, no
    /// algorithm, no expiry check. Exists only so the tests below can show
    /// that [`JwtKeys::verify`] refuses what this accepts.
    fn decode_unverified(token: &str) -> Option<Claims> {
        let payload = token.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    fn keys() -> JwtKeys {
        JwtKeys::new(SECRET, Algorithm::HS256, 900).unwrap()
    }

    fn claims(role: Role, exp_offset_seconds: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: "mallory".into(),
            role,
            iat: now,
            exp: now + exp_offset_seconds,
        }
    }

    fn sign(claims: &Claims, alg: Algorithm, secret: &str) -> String {
        encode(
            &Header::new(alg),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn unsigned_token(claims: &Claims) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
        format!("{header}.{payload}.")
    }

    #[test]
    fn test_issue_and_verify() {
        let keys = keys();
        let token = keys.issue("alice", Role::User).unwrap();
        assert_eq!(token.expires_in, 900);

        let claims = keys.verify(&token.token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_expiry_clamped_to_fifteen_minutes() {
        let keys = JwtKeys::new(SECRET, Algorithm::HS256, 86_400).unwrap();
        let token = keys.issue("alice", Role::Admin).unwrap();
        assert_eq!(token.expires_in, MAX_ACCESS_EXPIRY);
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(
            JwtKeys::new("", Algorithm::HS256, 900),
            Err(AuthError::Internal(_))
        ));
    }

    #[test]
    fn test_asymmetric_algorithm_rejected() {
        assert!(matches!(
            JwtKeys::new(SECRET, Algorithm::RS256, 900),
            Err(AuthError::Internal(_))
        ));
    }

    #[test]
    fn test_configured_algorithm_is_the_only_one_accepted() {
        let keys = JwtKeys::new(SECRET, Algorithm::HS512, 900).unwrap();

        let issued = keys.issue("alice", Role::User).unwrap().token;
        assert_eq!(
            jsonwebtoken::decode_header(&issued).unwrap().alg,
            Algorithm::HS512
        );
        assert_eq!(keys.verify(&issued).unwrap().sub, "alice");

        for alg in [Algorithm::HS256, Algorithm::HS384] {
            let token = sign(&claims(Role::Admin, 600), alg, SECRET);
            assert!(matches!(keys.verify(&token), Err(AuthError::InvalidToken)));
        }
    }

    #[test]
    fn test_fourteen_minute_token_accepted() {
        let token = sign(&claims(Role::User, 14 * 60), Algorithm::HS256, SECRET);
        assert_eq!(keys().verify(&token).unwrap().role, Role::User);
    }

    #[test]
    fn test_token_expired_one_second_ago_rejected() {
        let token = sign(&claims(Role::User, -1), Algorithm::HS256, SECRET);
        assert!(matches!(keys().verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_token_expiring_now_rejected() {
        let token = sign(&claims(Role::User, 0), Algorithm::HS256, SECRET);
        assert!(keys().verify(&token).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = sign(&claims(Role::Admin, 600), Algorithm::HS256, "other-secret");
        assert!(matches!(keys().verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_unexpected_algorithm_rejected() {
        for alg in [Algorithm::HS384, Algorithm::HS512] {
            let token = sign(&claims(Role::Admin, 600), alg, SECRET);
            assert!(matches!(keys().verify(&token), Err(AuthError::InvalidToken)));
        }
    }

    #[test]
    fn test_alg_none_admin_token_rejected() {
        let forged = unsigned_token(&claims(Role::Admin, 600));

        assert!(matches!(keys().verify(&forged), Err(AuthError::InvalidToken)));

        // The broken verifier happily grants admin.
        assert_eq!(decode_unverified(&forged).unwrap().role, Role::Admin);
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let genuine = keys().issue("bob", Role::User).unwrap().token;
        let parts: Vec<&str> = genuine.split('.').collect();

        let mut escalated = decode_unverified(&genuine).unwrap();
        escalated.role = Role::Admin;
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&escalated).unwrap());
        let tampered = format!("{}.{}.{}", parts[0], payload, parts[2]);

        assert!(matches!(keys().verify(&tampered), Err(AuthError::InvalidToken)));
        assert_eq!(decode_unverified(&tampered).unwrap().role, Role::Admin);
    }

    #[test]
    fn test_expired_token_trusted_only_by_broken_verifier() {
        let token = sign(&claims(Role::Admin, -3600), Algorithm::HS256, SECRET);
        assert!(keys().verify(&token).is_err());
        assert!(decode_unverified(&token).is_some());
    }

    #[test]
    fn test_garbage_rejected() {
        for token in ["", "abc", "a.b.c", "....."] {
            assert!(matches!(keys().verify(token), Err(AuthError::InvalidToken)));
        }
    }
}
