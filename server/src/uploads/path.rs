//! Path Traversal Protection
//!
//! Every user-influenced path is decoded to a fixed point before it is
//! normalized and checked for containment under the upload root. Layered
//! encodings (`%252e%252e%252f`), Unicode division slashes, overlong UTF-8
//! slashes, backslashes and null bytes all collapse to the same plain form,
//! so a single containment check covers them.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Upper bound on decode passes. Real paths converge in two or three.
pub const MAX_DECODE_PASSES: usize = 10;

/// U+2215 DIVISION SLASH.
const DIVISION_SLASH: char = '\u{2215}';

/// Overlong two-byte UTF-8 encoding of `/`, matched case-insensitively.
const OVERLONG_SLASH: &[u8] = b"%c0%af";

const ENCODED_NUL: &str = "%00";

/// Reasons a candidate path is refused.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PathError {
    /// Malformed encoding, or no fixed point within [`MAX_DECODE_PASSES`].
    #[error("path could not be decoded")]
    Decode,

    /// Resolved path lies outside the root.
    #[error("path escapes the upload root")]
    Traversal,

    /// Basename carries a raw or encoded null byte.
    #[error("path contains a null byte")]
    NullByte,

    /// Path could not be made absolute or is not valid UTF-8.
    #[error("path could not be resolved")]
    Unresolvable,
}

/// Outcome of decoding and resolving a candidate path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedPath {
    /// Candidate after decoding reached a fixed point.
    pub decoded_path: String,
    /// Absolute, lexically normalized form of the decoded path.
    pub resolved: PathBuf,
    /// Whether `resolved` is the root or lies beneath it.
    pub is_within_root: bool,
}

/// Check whether `candidate` stays inside `root` after full decoding.
///
/// Never panics; every failure path yields `false`.
pub fn is_path_safe(candidate: &str, root: &Path) -> bool {
    match sanitize_path(candidate, root) {
        Ok(sanitized) => sanitized.is_within_root,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected candidate path");
            false
        }
    }
}

/// Resolve a server-generated `filename` under `root`, refusing anything
/// that would land outside it.
pub fn resolve_within_root(root: &Path, filename: &str) -> Result<PathBuf, PathError> {
    let joined = root.join(filename);
    let joined = joined.to_str().ok_or(PathError::Unresolvable)?;

    let sanitized = sanitize_path(joined, root)?;
    if !sanitized.is_within_root {
        tracing::warn!(filename = %filename, "Potential path traversal attack detected");
        return Err(PathError::Traversal);
    }

    Ok(sanitized.resolved)
}

/// Decode `candidate`, resolve it and the root, and compare them.
pub fn sanitize_path(candidate: &str, root: &Path) -> Result<SanitizedPath, PathError> {
    let decoded_path = decode_path(candidate)?;

    if basename_has_null(&decoded_path) {
        return Err(PathError::NullByte);
    }

    let resolved = normalize(&absolutize(&strip_leading_parents(Path::new(&decoded_path)))?);
    let resolved_root = normalize(&absolutize(&strip_leading_parents(root))?);

    // Component-wise: `/data/uploads-evil` does not start with `/data/uploads`.
    let is_within_root = resolved.starts_with(&resolved_root);

    Ok(SanitizedPath {
        decoded_path,
        resolved,
        is_within_root,
    })
}

/// Apply [`decode_pass`] until the output stops changing.
pub fn decode_path(candidate: &str) -> Result<String, PathError> {
    let mut current = candidate.to_string();

    for _ in 0..MAX_DECODE_PASSES {
        let next = decode_pass(&current)?;
        if next == current {
            return Ok(next);
        }
        current = next;
    }

    tracing::warn!(
        passes = MAX_DECODE_PASSES,
        "Path decoding did not converge"
    );
    Err(PathError::Decode)
}

/// One full decoding pass.
fn decode_pass(input: &str) -> Result<String, PathError> {
    if !escapes_well_formed(input) {
        return Err(PathError::Decode);
    }

    // %C0%AF is invalid UTF-8 and would make URL decoding fail, so it goes first.
    let s = replace_overlong_slash(input);

    let s = urlencoding::decode(&s)
        .map_err(|_| PathError::Decode)?
        .into_owned();

    let s = s.replace(DIVISION_SLASH, "/").replace('\\', "/");
    let s = collapse_slashes(&s);

    Ok(s.replace('\0', "").replace(ENCODED_NUL, ""))
}

/// Every `%` must start a two-digit hex escape. `urlencoding` passes
/// `%zz` or a trailing `%` through untouched.
fn escapes_well_formed(input: &str) -> bool {
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|pair| pair.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    true
}

fn replace_overlong_slash(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest
        .as_bytes()
        .windows(OVERLONG_SLASH.len())
        .position(|w| w.eq_ignore_ascii_case(OVERLONG_SLASH))
    {
        // The pattern is pure ASCII, so both ends are char boundaries.
        out.push_str(&rest[..pos]);
        out.push('/');
        rest = &rest[pos + OVERLONG_SLASH.len()..];
    }

    out.push_str(rest);
    out
}

fn collapse_slashes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_slash = false;

    for c in input.chars() {
        if c == '/' {
            if !prev_slash {
                out.push(c);
            }
            prev_slash = true;
        } else {
            out.push(c);
            prev_slash = false;
        }
    }

    out
}

fn basename_has_null(path: &str) -> bool {
    let basename = path.rsplit('/').next().unwrap_or(path);
    basename.contains('\0') || basename.contains(ENCODED_NUL)
}

/// Drop `..` and `.` components at the start of a relative path.
fn strip_leading_parents(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }

    path.components()
        .skip_while(|c| matches!(c, Component::ParentDir | Component::CurDir))
        .collect()
}

/// Lexically resolve `.` and `..`.
///
/// Leading `..` segments of a relative path are dropped, and `..` at the
/// filesystem root stays at the root. The filesystem is never consulted.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    let mut depth = 0usize;

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth > 0 {
                    out.pop();
                    depth -= 1;
                }
            }
            Component::Normal(part) => {
                out.push(part);
                depth += 1;
            }
        }
    }

    out
}

fn absolutize(path: &Path) -> Result<PathBuf, PathError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    let cwd = std::env::current_dir().map_err(|_| PathError::Unresolvable)?;
    Ok(cwd.join(path))
}
