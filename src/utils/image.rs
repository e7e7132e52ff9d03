//! Image header parsing and content hashing

use sha2::{Digest, Sha256};

use super::mime::detect_format;
use crate::types::{ImageFormat, ImageMetadata};

/// Resolution reported when the header cannot be read
pub const FALLBACK_DIMENSIONS: (u32, u32) = (1920, 1080);

/// Lowercase hex SHA-256 of the raw bytes
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Compute metadata for raw image bytes. Never fails; unknown payloads
/// get `ImageFormat::Unknown` and fallback dimensions.
pub fn inspect(bytes: &[u8]) -> ImageMetadata {
    let format = detect_format(bytes);
    let (dimensions, exact) = match read_dimensions(format, bytes) {
        Some(d) => (d, true),
        None => (FALLBACK_DIMENSIONS, false),
    };
    ImageMetadata {
        format,
        width: dimensions.0,
        height: dimensions.1,
        dimensions_exact: exact,
        size_bytes: bytes.len(),
        content_hash: content_hash(bytes),
    }
}

/// Width and height from the format-specific header
pub fn read_dimensions(format: ImageFormat, bytes: &[u8]) -> Option<(u32, u32)> {
    let dims = match format {
        ImageFormat::Png => png_dimensions(bytes),
        ImageFormat::Gif => gif_dimensions(bytes),
        ImageFormat::WebP => webp_dimensions(bytes),
        ImageFormat::Jpeg => jpeg_dimensions(bytes),
        ImageFormat::Unknown => None,
    }?;
    (dims.0 > 0 && dims.1 > 0).then_some(dims)
}

fn be_u16(bytes: &[u8], at: usize) -> Option<u32> {
    let b = bytes.get(at..at + 2)?;
    Some(u16::from_be_bytes([b[0], b[1]]) as u32)
}

fn le_u16(bytes: &[u8], at: usize) -> Option<u32> {
    let b = bytes.get(at..at + 2)?;
    Some(u16::from_le_bytes([b[0], b[1]]) as u32)
}

fn le_u24(bytes: &[u8], at: usize) -> Option<u32> {
    let b = bytes.get(at..at + 3)?;
    Some(u32::from_le_bytes([b[0], b[1], b[2], 0]))
}

fn png_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    // Signature (8) + chunk length (4) + "IHDR" (4), then width and height
    if bytes.get(12..16)? != b"IHDR" {
        return None;
    }
    let w = bytes.get(16..20)?;
    let h = bytes.get(20..24)?;
    Some((
        u32::from_be_bytes([w[0], w[1], w[2], w[3]]),
        u32::from_be_bytes([h[0], h[1], h[2], h[3]]),
    ))
}

fn gif_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    Some((le_u16(bytes, 6)?, le_u16(bytes, 8)?))
}

fn webp_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    match bytes.get(12..16)? {
        // Lossy: frame tag (3) + start code 9d 01 2a, then 14-bit sizes
        b"VP8 " => {
            if bytes.get(23..26)? != [0x9d, 0x01, 0x2a] {
                return None;
            }
            Some((le_u16(bytes, 26)? & 0x3fff, le_u16(bytes, 28)? & 0x3fff))
        }
        // Lossless: signature 0x2f, then 14-bit (size - 1) fields
        b"VP8L" => {
            if *bytes.get(20)? != 0x2f {
                return None;
            }
            let b = bytes.get(21..25)?;
            let width = 1 + (b[0] as u32 | ((b[1] as u32 & 0x3f) << 8));
            let height =
                1 + ((b[1] as u32 >> 6) | ((b[2] as u32) << 2) | ((b[3] as u32 & 0x0f) << 10));
            Some((width, height))
        }
        // Extended: 24-bit (canvas size - 1) fields
        b"VP8X" => Some((1 + le_u24(bytes, 24)?, 1 + le_u24(bytes, 27)?)),
        _ => None,
    }
}

fn jpeg_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    let mut i = 2;
    while i + 1 < bytes.len() {
        if bytes[i] != 0xFF {
            return None;
        }
        let marker = bytes[i + 1];
        match marker {
            // Fill byte
            0xFF => {
                i += 1;
                continue;
            }
            // Standalone markers carry no length
            0x01 | 0xD0..=0xD8 => {
                i += 2;
                continue;
            }
            // Start of scan or end of image before any frame header
            0xDA | 0xD9 => return None,
            // SOF0..SOF15, excluding DHT (C4), JPG (C8) and DAC (CC)
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                let height = be_u16(bytes, i + 5)?;
                let width = be_u16(bytes, i + 7)?;
                return Some((width, height));
            }
            _ => {
                let len = be_u16(bytes, i + 2)? as usize;
                if len < 2 {
                    return None;
                }
                i += 2 + len;
            }
        }
    }
    None
}


#[cfg(test)]
mod tests {
    use super::test_images::*;
    use super::*;

    #[test]
    fn reads_png_gif_jpeg_webp_dimensions() {
        assert_eq!(read_dimensions(ImageFormat::Png, &png(800, 600)), Some((800, 600)));
        assert_eq!(read_dimensions(ImageFormat::Gif, &gif(320, 200)), Some((320, 200)));
        assert_eq!(read_dimensions(ImageFormat::Jpeg, &jpeg(1280, 720)), Some((1280, 720)));
        assert_eq!(
            read_dimensions(ImageFormat::WebP, &webp_extended(640, 480)),
            Some((640, 480))
        );
    }

    #[test]
    fn truncated_header_falls_back() {
        let meta = inspect(&[0xFF, 0xD8]);
        assert_eq!(meta.format, ImageFormat::Jpeg);
        assert!(!meta.dimensions_exact);
        assert_eq!((meta.width, meta.height), FALLBACK_DIMENSIONS);
    }

    #[test]
    fn inspect_hashes_content() {
        let bytes = png(10, 10);
        let meta = inspect(&bytes);
        assert_eq!(meta.size_bytes, bytes.len());
        assert_eq!(meta.content_hash.len(), 64);
        assert_eq!(meta.content_hash, content_hash(&bytes));
        assert!(meta.dimensions_exact);
        // Known vector for the empty input
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
