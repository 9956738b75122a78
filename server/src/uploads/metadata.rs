//! Metadata stripping for accepted avatars.
//!
//! Images are decoded to pixels and encoded again in their original format.
//! Encoders never carry over EXIF, XMP, comments or text chunks, so the
//! output holds pixel data only. Animated GIFs keep every frame.

use std::io::Cursor;

use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::{AnimationDecoder, ImageDecoder, ImageFormat, ImageReader, Limits};
use thiserror::Error;

/// Maximum input size we'll attempt to re-encode (8 MB).
const MAX_PROCESSABLE_SIZE: usize = 8 * 1024 * 1024;

/// Maximum image dimension (width or height) to prevent decompression bombs.
const MAX_IMAGE_DIMENSION: u32 = 8192;

/// JPEG re-encode quality.
const JPEG_QUALITY: u8 = 90;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File too large for processing: {0} bytes")]
    TooLarge(usize),
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Image decode failed: {0}")]
    DecodeFailed(String),
    #[error("Image encoding failed: {0}")]
    EncodeFailed(String),
}

/// Re-encode `data` without any embedded metadata.
///
/// `mime_type` must be the sniffed type, not the client-declared one.
/// This function is CPU-bound and should be called inside `spawn_blocking`.
pub fn strip_metadata(data: &[u8], mime_type: &str) -> Result<Vec<u8>, ProcessingError> {
    if data.len() > MAX_PROCESSABLE_SIZE {
        return Err(ProcessingError::TooLarge(data.len()));
    }

    match mime_to_format(mime_type)? {
        ImageFormat::Gif => reencode_gif(data),
        format => reencode_still(data, format),
    }
}

/// Map MIME type to `image` crate format.
fn mime_to_format(mime_type: &str) -> Result<ImageFormat, ProcessingError> {
    match mime_type {
        "image/png" => Ok(ImageFormat::Png),
        "image/jpeg" => Ok(ImageFormat::Jpeg),
        "image/gif" => Ok(ImageFormat::Gif),
        other => Err(ProcessingError::UnsupportedFormat(other.to_string())),
    }
}

fn decode_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
    limits.max_image_height = Some(MAX_IMAGE_DIMENSION);
    limits
}

fn reencode_still(data: &[u8], format: ImageFormat) -> Result<Vec<u8>, ProcessingError> {
    let mut reader = ImageReader::with_format(Cursor::new(data), format);
    reader.limits(decode_limits());

    let img = reader
        .decode()
        .map_err(|e| ProcessingError::DecodeFailed(e.to_string()))?;

    let mut buf = Cursor::new(Vec::new());
    if format == ImageFormat::Jpeg {
        // JPEG has no alpha channel
        let rgb = img.to_rgb8();
        JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY)
            .encode_image(&rgb)
            .map_err(|e| ProcessingError::EncodeFailed(e.to_string()))?;
    } else {
        img.write_to(&mut buf, format)
            .map_err(|e| ProcessingError::EncodeFailed(e.to_string()))?;
    }

    Ok(buf.into_inner())
}

fn reencode_gif(data: &[u8]) -> Result<Vec<u8>, ProcessingError> {
    let mut decoder = GifDecoder::new(Cursor::new(data))
        .map_err(|e| ProcessingError::DecodeFailed(e.to_string()))?;
    decoder
        .set_limits(decode_limits())
        .map_err(|e| ProcessingError::DecodeFailed(e.to_string()))?;

    let frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|e| ProcessingError::DecodeFailed(e.to_string()))?;

    let mut buf = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut buf);
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| ProcessingError::EncodeFailed(e.to_string()))?;
        encoder
            .encode_frames(frames)
            .map_err(|e| ProcessingError::EncodeFailed(e.to_string()))?;
    }

    Ok(buf)
}
