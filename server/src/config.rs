//! Server Configuration
//!
//! Loads configuration from environment variables.

use anyhow::{bail, Context, Result};
use jsonwebtoken::Algorithm;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Longest access token lifetime the server will issue (15 min).
pub const MAX_ACCESS_EXPIRY: i64 = 900;

/// Token signing algorithm unless `JWT_ALGORITHM` says otherwise.
pub const DEFAULT_JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// Default maximum avatar size (2 MiB).
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 2 * 1024 * 1024;

/// MIME types accepted for avatars unless overridden.
pub const DEFAULT_ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif"];

/// Filename extensions accepted for avatars unless overridden.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[".jpeg", ".jpg", ".png", ".gif"];

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:3000")
    pub bind_address: String,

    /// Shared signing secret for access tokens
    pub jwt_secret: String,

    /// HMAC algorithm tokens are signed with and the only one accepted
    pub jwt_algorithm: Algorithm,

    /// Access token expiry in seconds (default and ceiling: 900 = 15 min)
    pub jwt_access_expiry: i64,

    /// Directory avatars are written to
    pub upload_dir: PathBuf,

    /// Maximum avatar size in bytes (default: 2 MiB)
    pub max_upload_size: usize,

    /// Allowed MIME types for avatars (comma-separated)
    pub allowed_mime_types: Vec<String>,

    /// Allowed filename extensions for avatars (comma-separated, with leading dot)
    pub allowed_extensions: Vec<String>,

    /// JSON file holding the static user directory
    pub users_file: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let jwt_access_expiry = env::var("JWT_ACCESS_EXPIRY")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(MAX_ACCESS_EXPIRY)
            .min(MAX_ACCESS_EXPIRY);

        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".into()),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_algorithm: match env::var("JWT_ALGORITHM") {
                Ok(v) => parse_hmac_algorithm(&v)?,
                Err(_) => DEFAULT_JWT_ALGORITHM,
            },
            jwt_access_expiry,
            upload_dir: env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "uploads/avatars".into())
                .into(),
            max_upload_size: env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_UPLOAD_SIZE),
            allowed_mime_types: list_from_env("ALLOWED_MIME_TYPES")
                .unwrap_or_else(|| to_owned_list(DEFAULT_ALLOWED_MIME_TYPES)),
            allowed_extensions: list_from_env("ALLOWED_EXTENSIONS")
                .map(|exts| exts.iter().map(|e| normalize_extension(e)).collect())
                .unwrap_or_else(|| to_owned_list(DEFAULT_ALLOWED_EXTENSIONS)),
            users_file: env::var("USERS_FILE")
                .unwrap_or_else(|_| "users.json".into())
                .into(),
        })
    }

    /// Create a default configuration for testing.
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".into(),
            jwt_secret: "test-secret".into(),
            jwt_algorithm: DEFAULT_JWT_ALGORITHM,
            jwt_access_expiry: MAX_ACCESS_EXPIRY,
            upload_dir: std::env::temp_dir().join("warden-test-avatars"),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            allowed_mime_types: to_owned_list(DEFAULT_ALLOWED_MIME_TYPES),
            allowed_extensions: to_owned_list(DEFAULT_ALLOWED_EXTENSIONS),
            users_file: "users.json".into(),
        }
    }
}

/// Accept only the shared-secret algorithms: HS256, HS384 or HS512.
fn parse_hmac_algorithm(value: &str) -> Result<Algorithm> {
    let algorithm = Algorithm::from_str(value.trim())
        .with_context(|| format!("JWT_ALGORITHM {value:?} is not a known algorithm"))?;

    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
        other => bail!("JWT_ALGORITHM must be HS256, HS384 or HS512, got {other:?}"),
    }
}

/// Parse a comma-separated variable, skipping empty items.
fn list_from_env(key: &str) -> Option<Vec<String>> {
    env::var(key).ok().map(|s| {
        s.split(',')
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect()
    })
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// `png` and `.png` both become `.png`.
fn normalize_extension(ext: &str) -> String {
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}
