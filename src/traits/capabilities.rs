//! ProviderCapabilities structure
//!
//! Static facts about what a provider can do. Built once per provider kind,
//! never mutated afterwards.

use crate::error::LlmError;
use crate::types::ImageFormat;
use crate::utils::mime::{describe_mime, detect_format};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderCapabilities {
    pub vision: bool,
    pub streaming: bool,
    /// Native JSON mode; when false JSON output is requested through the prompt
    pub structured_output: bool,
    pub max_tokens: u32,
    pub max_image_size_bytes: usize,
    pub supported_image_formats: Vec<ImageFormat>,
    /// Vendor ceiling, None when unlimited (local runtimes)
    pub requests_per_minute: Option<u32>,
    pub context_window: u32,
}

impl ProviderCapabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vision(mut self, formats: &[ImageFormat], max_image_size_bytes: usize) -> Self {
        self.vision = true;
        self.supported_image_formats = formats.to_vec();
        self.max_image_size_bytes = max_image_size_bytes;
        self
    }
    pub fn with_streaming(mut self) -> Self {
        self.streaming = true;
        self
    }
    pub fn with_structured_output(mut self) -> Self {
        self.structured_output = true;
        self
    }
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
    pub fn with_requests_per_minute(mut self, rpm: u32) -> Self {
        self.requests_per_minute = Some(rpm);
        self
    }
    pub fn with_context_window(mut self, tokens: u32) -> Self {
        self.context_window = tokens;
        self
    }

    pub fn supports_format(&self, format: ImageFormat) -> bool {
        format.is_known() && self.supported_image_formats.contains(&format)
    }

    /// Validate image bytes against this descriptor without any I/O.
    ///
    /// Unknown or unlisted formats fail with `UnsupportedFormat`, oversize
    /// payloads with `PayloadTooLarge`.
    pub fn check_image(&self, bytes: &[u8]) -> Result<ImageFormat, LlmError> {
        let format = detect_format(bytes);
        if !self.supports_format(format) {
            return Err(LlmError::UnsupportedFormat {
                mime: describe_mime(bytes),
            });
        }
        if bytes.len() > self.max_image_size_bytes {
            return Err(LlmError::PayloadTooLarge {
                size: bytes.len(),
                limit: self.max_image_size_bytes,
            });
        }
        Ok(format)
    }

    pub fn supports(&self, feature: &str) -> bool {
        match feature {
            "vision" => self.vision,
            "streaming" => self.streaming,
            "structured_output" | "json" => self.structured_output,
            _ => false,
        }
    }
}
