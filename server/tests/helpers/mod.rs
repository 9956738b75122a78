//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp` for building and sending requests through the full axum
//! router, plus token minting, multipart bodies, and image fixtures.
#![allow(dead_code)]

use std::io::Cursor;
use std::path::PathBuf;

use axum::body::Body;
use axum::http::{self, Method, Request, Response};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use tempfile::TempDir;
use tower::ServiceExt;
use warden_server::api::{create_router, AppState};
use warden_server::auth::{Claims, Role, UserDirectory};
use warden_server::config::Config;

/// Multipart boundary used by [`multipart_file`].
pub const BOUNDARY: &str = "----WardenTestBoundary";

const TEST_USERS: &str = r#"[
    { "username": "alice", "password": "wonderland", "role": "user" },
    { "username": "root", "password": "toor", "role": "admin" }
]"#;

/// Full router wired to a private upload directory.
pub struct TestApp {
    pub router: Router,
    pub config: Config,
    /// Kept alive for the lifetime of the test; removed on drop.
    pub upload_dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Build the app after adjusting the test config.
    pub fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let upload_dir = tempfile::tempdir().expect("Failed to create upload dir");

        let mut config = Config::default_for_test();
        config.upload_dir = upload_dir.path().to_path_buf();
        adjust(&mut config);

        let users = UserDirectory::from_json(TEST_USERS).expect("Invalid test users");
        let state = AppState::new(config.clone(), users).expect("Failed to build state");

        Self {
            router: create_router(state),
            config,
            upload_dir,
        }
    }

    /// Start building a request.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Send a request through the router.
    pub async fn oneshot(&self, req: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(req)
            .await
            .expect("Router is infallible")
    }

    /// GET `uri` with an optional bearer token.
    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        let mut req = Self::request(Method::GET, uri);
        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        self.oneshot(req.body(Body::empty()).unwrap()).await
    }

    /// POST a multipart avatar upload.
    pub async fn upload(&self, token: Option<&str>, body: Vec<u8>) -> Response<Body> {
        let mut req = Self::request(Method::POST, "/upload-avatar").header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        self.oneshot(req.body(Body::from(body)).unwrap()).await
    }

    /// Files currently in the upload directory.
    pub fn stored_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.upload_dir.path())
            .expect("Upload dir vanished")
            .map(|entry| entry.unwrap().path())
            .collect()
    }
}

/// Sign claims with the configured secret and an arbitrary algorithm.
pub fn sign_claims(config: &Config, claims: &Claims, alg: Algorithm) -> String {
    sign_with_secret(&config.jwt_secret, claims, alg)
}

pub fn sign_with_secret(secret: &str, claims: &Claims, alg: Algorithm) -> String {
    jsonwebtoken::encode(
        &Header::new(alg),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to sign test token")
}

/// Claims for `subject` expiring `exp_offset_seconds` from now.
pub fn claims(subject: &str, role: Role, exp_offset_seconds: i64) -> Claims {
    let now = Utc::now().timestamp();
    Claims {
        sub: subject.to_string(),
        role,
        iat: now,
        exp: now + exp_offset_seconds,
    }
}

/// A valid 14-minute token signed with the configured algorithm.
pub fn generate_access_token(config: &Config, subject: &str, role: Role) -> String {
    sign_claims(config, &claims(subject, role, 14 * 60), config.jwt_algorithm)
}

pub async fn body_bytes(resp: Response<Body>) -> Vec<u8> {
    resp.into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(resp: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(resp).await).expect("Body is not JSON")
}

pub async fn body_text(resp: Response<Body>) -> String {
    String::from_utf8(body_bytes(resp).await).expect("Body is not UTF-8")
}

/// Multipart body with one file field.
pub fn multipart_file(
    field: &str,
    filename: &str,
    content_type: Option<&str>,
    data: &[u8],
) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
    )
    .into_bytes();
    if let Some(ct) = content_type {
        body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 3) as u8, (y * 3) as u8, 200])
    }))
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).expect("Failed to encode fixture");
    buf.into_inner()
}

pub fn png_fixture() -> Vec<u8> {
    encode(&gradient(32, 32), ImageFormat::Png)
}

pub fn gif_fixture() -> Vec<u8> {
    encode(&gradient(16, 16), ImageFormat::Gif)
}

fn push_segment(out: &mut Vec<u8>, marker: u8, payload: &[u8]) {
    let len = u16::try_from(payload.len() + 2).expect("Segment too long");
    out.extend_from_slice(&[0xFF, marker]);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(payload);
}

/// A JPEG carrying an EXIF block, padded with comment segments to at
/// least `target_len` bytes.
pub fn jpeg_with_exif(target_len: usize) -> Vec<u8> {
    let base = encode(&gradient(64, 64), ImageFormat::Jpeg);

    let mut out = vec![0xFF, 0xD8];
    push_segment(&mut out, 0xE1, b"Exif\0\0MM\0*\0\0\0\x08\0\0CAMERA-SERIAL-1234");
    while out.len() + base.len() - 2 < target_len {
        let remaining = target_len - (out.len() + base.len() - 2);
        let chunk = remaining.saturating_sub(4).clamp(1, 65533);
        push_segment(&mut out, 0xFE, &vec![b'x'; chunk]);
    }
    out.extend_from_slice(&base[2..]);
    out
}

/// Does `haystack` contain `needle`?
pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
