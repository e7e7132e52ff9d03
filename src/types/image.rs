//! Image input and metadata types

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Image formats recognized by magic-byte inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    #[serde(rename = "webp")]
    WebP,
    Gif,
    Unknown,
}

impl ImageFormat {
    /// All formats that can be sent to a vendor.
    pub const KNOWN: [ImageFormat; 4] = [Self::Png, Self::Jpeg, Self::WebP, Self::Gif];

    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
            Self::Unknown => "application/octet-stream",
        }
    }

    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::WebP => "webp",
            Self::Gif => "gif",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Image payload as supplied by a caller: raw bytes or a base64 string.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageInput {
    Bytes(Vec<u8>),
    Base64(String),
}

impl ImageInput {
    /// Decode into raw bytes. A `data:` URI prefix is accepted for base64 input.
    pub fn to_bytes(&self) -> Result<Vec<u8>, LlmError> {
        match self {
            Self::Bytes(bytes) => Ok(bytes.clone()),
            Self::Base64(encoded) => {
                let payload = match encoded.split_once(";base64,") {
                    Some((prefix, data)) if prefix.starts_with("data:") => data,
                    _ => encoded.as_str(),
                };
                BASE64
                    .decode(payload.trim())
                    .map_err(|e| LlmError::InvalidParameter(format!("Invalid base64 image: {e}")))
            }
        }
    }
}

impl From<Vec<u8>> for ImageInput {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for ImageInput {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

/// Validated image ready to be embedded in a vendor payload.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub format: ImageFormat,
    pub base64: String,
}

impl EncodedImage {
    pub fn new(format: ImageFormat, bytes: &[u8]) -> Self {
        Self {
            format,
            base64: BASE64.encode(bytes),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// `data:<mime>;base64,<payload>` form used by chat-completions style APIs.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), self.base64)
    }
}

/// Metadata computed during validation, before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    /// False when the header could not be read and a fallback resolution was used
    pub dimensions_exact: bool,
    pub size_bytes: usize,
    /// Lowercase hex SHA-256 of the raw bytes
    pub content_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_input_accepts_data_uri() {
        let raw = vec![0x89, b'P', b'N', b'G'];
        let encoded = EncodedImage::new(ImageFormat::Png, &raw);
        let input = ImageInput::Base64(encoded.data_uri());
        assert_eq!(input.to_bytes().unwrap(), raw);

        let plain = ImageInput::Base64(encoded.base64.clone());
        assert_eq!(plain.to_bytes().unwrap(), raw);
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let input = ImageInput::Base64("not base64!!".into());
        assert!(matches!(
            input.to_bytes(),
            Err(LlmError::InvalidParameter(_))
        ));
    }
}
