//! Allow-list policy and the declared-type check.
//!
//! The declared check trusts client-supplied headers and only serves as a
//! fast-path filter. Content sniffing in [`super::sniff`] is authoritative.

use std::collections::HashSet;
use std::path::Path;

use super::error::UploadError;
use crate::config::Config;

/// Immutable upload allow-list, built once at startup.
#[derive(Debug, Clone)]
pub struct AllowListPolicy {
    allowed_mime_types: HashSet<String>,
    allowed_extensions: HashSet<String>,
    max_size_bytes: usize,
}

impl AllowListPolicy {
    /// Build a policy. MIME types and extensions are compared lowercased.
    pub fn new<M, E>(mime_types: M, extensions: E, max_size_bytes: usize) -> Self
    where
        M: IntoIterator,
        M::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Self {
            allowed_mime_types: mime_types
                .into_iter()
                .map(|m| m.as_ref().to_lowercase())
                .collect(),
            allowed_extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().to_lowercase())
                .collect(),
            max_size_bytes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.allowed_mime_types,
            &config.allowed_extensions,
            config.max_upload_size,
        )
    }

    pub fn allows_mime(&self, mime_type: &str) -> bool {
        self.allowed_mime_types.contains(&mime_type.to_lowercase())
    }

    /// `extension` includes the leading dot, e.g. `.png`.
    pub fn allows_extension(&self, extension: &str) -> bool {
        self.allowed_extensions.contains(&extension.to_lowercase())
    }

    pub const fn max_size_bytes(&self) -> usize {
        self.max_size_bytes
    }

    /// Check the client-declared MIME type and filename extension.
    ///
    /// Returns the lowercased extension (with leading dot) on success.
    pub fn check_declared(
        &self,
        declared_mime: &str,
        original_filename: &str,
    ) -> Result<String, UploadError> {
        if !self.allows_mime(declared_mime) {
            return Err(UploadError::InvalidMimeType {
                mime_type: declared_mime.to_string(),
            });
        }

        let extension = extension_of(original_filename).ok_or(UploadError::InvalidExtension)?;
        if !self.allows_extension(&extension) {
            return Err(UploadError::InvalidExtension);
        }

        Ok(extension)
    }
}

/// Lowercased extension of the last path component, with leading dot.
///
/// Dotfiles such as `.png` have no extension.
pub fn extension_of(filename: &str) -> Option<String> {
    // Clients on Windows may send backslash-separated names.
    let last = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    Path::new(last)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_ALLOWED_MIME_TYPES};

    fn policy() -> AllowListPolicy {
        AllowListPolicy::new(
            DEFAULT_ALLOWED_MIME_TYPES,
            DEFAULT_ALLOWED_EXTENSIONS,
            2 * 1024 * 1024,
        )
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("photo.PNG").as_deref(), Some(".png"));
        assert_eq!(extension_of("archive.tar.gif").as_deref(), Some(".gif"));
        assert_eq!(extension_of("..\\..\\avatar.Jpg").as_deref(), Some(".jpg"));
        assert_eq!(extension_of(".png"), None);
        assert_eq!(extension_of("noext"), None);
    }

    #[test]
    fn test_accepts_allowed_pairs() {
        let policy = policy();
        assert_eq!(policy.check_declared("image/png", "me.png").unwrap(), ".png");
        assert_eq!(policy.check_declared("image/jpeg", "me.JPEG").unwrap(), ".jpeg");
        assert_eq!(policy.check_declared("IMAGE/GIF", "me.gif").unwrap(), ".gif");
    }

    #[test]
    fn test_rejects_disallowed_mime() {
        let err = policy().check_declared("application/x-msdownload", "me.png");
        assert!(matches!(err, Err(UploadError::InvalidMimeType { .. })));

        let err = policy().check_declared("image/webp", "me.png");
        assert!(matches!(err, Err(UploadError::InvalidMimeType { .. })));
    }

    #[test]
    fn test_rejects_disallowed_extension() {
        let policy = policy();
        assert!(matches!(
            policy.check_declared("image/png", "payload.php"),
            Err(UploadError::InvalidExtension)
        ));
        assert!(matches!(
            policy.check_declared("image/png", "payload.png.exe"),
            Err(UploadError::InvalidExtension)
        ));
        assert!(matches!(
            policy.check_declared("image/png", "no-extension"),
            Err(UploadError::InvalidExtension)
        ));
    }

    #[test]
    fn test_policy_from_config() {
        let policy = AllowListPolicy::from_config(&Config::default_for_test());
        assert!(policy.allows_mime("image/jpeg"));
        assert!(policy.allows_extension(".JPG"));
        assert!(!policy.allows_extension(".svg"));
        assert_eq!(policy.max_size_bytes(), 2 * 1024 * 1024);
    }
}
