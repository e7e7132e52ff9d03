//! Uniform generation request/response shapes shared by every adapter

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::image::{EncodedImage, ImageInput};
use crate::providers::ProviderKind;

pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Caller-facing text generation request
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct GenerationRequest {
    #[validate(length(min = 1, message = "prompt must not be empty"))]
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub image: Option<ImageInput>,
    /// Model override; the adapter's configured model is used when absent
    pub model: Option<String>,
    #[validate(range(min = 1))]
    pub max_tokens: u32,
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: f32,
    pub structured_output: bool,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            image: None,
            model: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            structured_output: false,
        }
    }

    pub fn with_system_prompt(mut self, system: impl Into<String>) -> Self {
        self.system_prompt = Some(system.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<ImageInput>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub const fn with_structured_output(mut self, enabled: bool) -> Self {
        self.structured_output = enabled;
        self
    }
}

/// Caller-facing image analysis request
#[derive(Debug, Clone, PartialEq)]
pub struct VisionRequest {
    pub image: ImageInput,
    pub prompt: String,
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl VisionRequest {
    pub fn new(image: impl Into<ImageInput>, prompt: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            prompt: prompt.into(),
            model: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.2,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Fully resolved request handed to a request transformer.
///
/// Model is chosen, image is validated and encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub model: String,
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub image: Option<EncodedImage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub structured_output: bool,
}

/// Normalized reason a generation call stopped producing output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    #[default]
    Stop,
    Length,
    ContentFilter,
    Error,
}

/// Token usage. Unknown counts are reported as 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub const fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Build from vendor counters, which may be missing or negative.
    pub fn from_counts(input: Option<i64>, output: Option<i64>) -> Self {
        let clamp = |v: Option<i64>| v.unwrap_or(0).clamp(0, u32::MAX as i64) as u32;
        Self::new(clamp(input), clamp(output))
    }

    pub const fn total_tokens(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }

    pub fn merge(&mut self, other: &Usage) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
    }
}

/// Normalized generation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
    pub model: String,
    pub provider: ProviderKind,
    pub usage: Usage,
    pub finish_reason: FinishReason,
    /// Latency of the network exchange in milliseconds
    pub latency_ms: u64,
    /// Vendor-specific accounting fields (cache tokens, reported cost, ...)
    #[serde(default)]
    pub provider_metadata: HashMap<String, serde_json::Value>,
}

impl GenerationResult {
    pub const fn total_tokens(&self) -> u32 {
        self.usage.total_tokens()
    }
}
