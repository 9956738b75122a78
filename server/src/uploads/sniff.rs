//! Magic byte content sniffing.

use super::error::UploadError;
use super::policy::AllowListPolicy;

/// Detect the MIME type of `data` from its signature alone.
pub fn sniff_mime(data: &[u8]) -> Option<&'static str> {
    infer::get(data).map(|kind| kind.mime_type())
}

/// Confirm the bytes really are what the client claimed.
///
/// The detected type must be allow-listed, equal to the declared type, and
/// consistent with the filename extension. A real JPEG declared as PNG is
/// therefore a [`UploadError::ContentMismatch`]. Returns the detected type.
pub fn verify_content(
    policy: &AllowListPolicy,
    data: &[u8],
    declared_mime: &str,
    extension: &str,
) -> Result<&'static str, UploadError> {
    let mismatch = |detected: Option<&str>| UploadError::ContentMismatch {
        declared: declared_mime.to_string(),
        detected: detected.map(str::to_string),
    };

    let Some(detected) = sniff_mime(data) else {
        tracing::warn!(
            declared_mime = %declared_mime,
            size = data.len(),
            "File content does not match any known magic byte signature"
        );
        return Err(mismatch(None));
    };

    if !policy.allows_mime(detected) {
        tracing::warn!(
            declared_mime = %declared_mime,
            detected_mime = %detected,
            "Detected file type is not allow-listed"
        );
        return Err(mismatch(Some(detected)));
    }

    if !detected.eq_ignore_ascii_case(declared_mime) || !extension_matches(extension, detected) {
        tracing::warn!(
            declared_mime = %declared_mime,
            detected_mime = %detected,
            extension = %extension,
            "File content type mismatch"
        );
        return Err(mismatch(Some(detected)));
    }

    Ok(detected)
}

/// Whether `extension` (with leading dot) maps to `mime_type`.
fn extension_matches(extension: &str, mime_type: &str) -> bool {
    let ext = extension.trim_start_matches('.');
    mime_guess::from_ext(ext)
        .iter()
        .any(|guess| guess.essence_str() == mime_type)
}
