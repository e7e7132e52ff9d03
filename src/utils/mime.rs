//! Image format detection by magic bytes
//!
//! Only PNG, JPEG, WebP and GIF are classified; everything else is `Unknown`.
//! The `infer` crate is used to name what an unsupported payload actually is.

use crate::types::ImageFormat;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8];

/// Classify image bytes by their leading magic number
pub fn detect_format(bytes: &[u8]) -> ImageFormat {
    if bytes.starts_with(PNG_SIGNATURE) {
        ImageFormat::Png
    } else if bytes.starts_with(JPEG_SIGNATURE) {
        ImageFormat::Jpeg
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        ImageFormat::WebP
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        ImageFormat::Gif
    } else {
        ImageFormat::Unknown
    }
}

/// Guess MIME by inspecting bytes (magic numbers)
pub fn guess_mime_from_bytes(bytes: &[u8]) -> Option<String> {
    infer::get(bytes).map(|k| k.mime_type().to_string())
}

/// MIME type to report for a payload: the detected image type, or whatever
/// `infer` recognizes, otherwise octet-stream.
pub fn describe_mime(bytes: &[u8]) -> String {
    let format = detect_format(bytes);
    if format.is_known() {
        return format.mime_type().to_string();
    }
    guess_mime_from_bytes(bytes).unwrap_or_else(|| "application/octet-stream".to_string())
}
