//! Provider implementations
//!
//! The closed set of supported vendors. Each vendor module contributes its
//! request/response transformers and endpoint hooks; `ProviderClient` wires
//! them into the uniform `ProviderAdapter` contract.

pub mod anthropic;
pub mod client;
pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod openai_compatible;

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::retry::ResiliencePolicy;
use crate::traits::ProviderCapabilities;
use crate::types::{ImageFormat, ProviderConfig};

pub use client::ProviderClient;

const MIB: usize = 1024 * 1024;

/// Default per-call timeout for hosted vendors
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
/// Default per-call timeout for locally hosted runtimes
pub const LOCAL_TIMEOUT: Duration = Duration::from_secs(300);

/// Supported vendors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Gemini,
    Mistral,
    DeepSeek,
    Qwen,
    OpenRouter,
    Ollama,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 8] = [
        Self::OpenAi,
        Self::Anthropic,
        Self::Gemini,
        Self::Mistral,
        Self::DeepSeek,
        Self::Qwen,
        Self::OpenRouter,
        Self::Ollama,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
            Self::Mistral => "mistral",
            Self::DeepSeek => "deepseek",
            Self::Qwen => "qwen",
            Self::OpenRouter => "openrouter",
            Self::Ollama => "ollama",
        }
    }

    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Gemini => "Google Gemini",
            Self::Mistral => "Mistral AI",
            Self::DeepSeek => "DeepSeek",
            Self::Qwen => "Alibaba Qwen",
            Self::OpenRouter => "OpenRouter",
            Self::Ollama => "Ollama",
        }
    }

    pub const fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com/v1",
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Self::Mistral => "https://api.mistral.ai/v1",
            Self::DeepSeek => "https://api.deepseek.com/v1",
            Self::Qwen => "https://dashscope.aliyuncs.com/compatible-mode/v1",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
            Self::Ollama => "http://localhost:11434",
        }
    }

    pub const fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o",
            Self::Anthropic => "claude-3-5-sonnet-20241022",
            Self::Gemini => "gemini-1.5-flash",
            Self::Mistral => "mistral-large-latest",
            Self::DeepSeek => "deepseek-chat",
            Self::Qwen => "qwen-plus",
            Self::OpenRouter => "openai/gpt-4o",
            Self::Ollama => "llama3.1",
        }
    }

    /// Model used for image analysis when none is configured
    pub const fn default_vision_model(&self) -> &'static str {
        match self {
            Self::Mistral => "pixtral-12b-2409",
            Self::Qwen => "qwen-vl-plus",
            Self::Ollama => "llava",
            other => other.default_model(),
        }
    }

    /// Environment variables checked, in order, for a credential. For Ollama
    /// the variable holds the endpoint instead.
    pub const fn env_vars(&self) -> &'static [&'static str] {
        match self {
            Self::OpenAi => &["OPENAI_API_KEY"],
            Self::Anthropic => &["ANTHROPIC_API_KEY"],
            Self::Gemini => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
            Self::Mistral => &["MISTRAL_API_KEY"],
            Self::DeepSeek => &["DEEPSEEK_API_KEY"],
            Self::Qwen => &["DASHSCOPE_API_KEY"],
            Self::OpenRouter => &["OPENROUTER_API_KEY"],
            Self::Ollama => &["OLLAMA_BASE_URL"],
        }
    }

    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Ollama)
    }

    pub const fn requires_api_key(&self) -> bool {
        !self.is_local()
    }

    pub const fn default_timeout(&self) -> Duration {
        if self.is_local() {
            LOCAL_TIMEOUT
        } else {
            DEFAULT_TIMEOUT
        }
    }

    /// Static capability descriptor for the vendor
    pub fn capabilities(&self) -> ProviderCapabilities {
        use ImageFormat::{Gif, Jpeg, Png, WebP};
        let base = ProviderCapabilities::new().with_streaming();
        match self {
            Self::OpenAi => base
                .with_vision(&ImageFormat::KNOWN, 20 * MIB)
                .with_structured_output()
                .with_max_tokens(16_384)
                .with_requests_per_minute(500)
                .with_context_window(128_000),
            Self::Anthropic => base
                .with_vision(&[Png, Jpeg, WebP, Gif], 5 * MIB)
                .with_max_tokens(8192)
                .with_requests_per_minute(50)
                .with_context_window(200_000),
            Self::Gemini => base
                .with_vision(&[Png, Jpeg, WebP], 20 * MIB)
                .with_structured_output()
                .with_max_tokens(8192)
                .with_requests_per_minute(60)
                .with_context_window(1_048_576),
            Self::Mistral => base
                .with_vision(&ImageFormat::KNOWN, 10 * MIB)
                .with_structured_output()
                .with_max_tokens(8192)
                .with_requests_per_minute(60)
                .with_context_window(128_000),
            Self::DeepSeek => base
                .with_structured_output()
                .with_max_tokens(8192)
                .with_requests_per_minute(60)
                .with_context_window(64_000),
            Self::Qwen => base
                .with_vision(&[Png, Jpeg, WebP], 10 * MIB)
                .with_structured_output()
                .with_max_tokens(8192)
                .with_requests_per_minute(60)
                .with_context_window(32_768),
            Self::OpenRouter => base
                .with_vision(&ImageFormat::KNOWN, 20 * MIB)
                .with_max_tokens(8192)
                .with_requests_per_minute(200)
                .with_context_window(128_000),
            Self::Ollama => base
                .with_vision(&[Png, Jpeg], 20 * MIB)
                .with_structured_output()
                .with_max_tokens(4096)
                .with_context_window(8192),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "gemini" | "google" => Ok(Self::Gemini),
            "mistral" => Ok(Self::Mistral),
            "deepseek" => Ok(Self::DeepSeek),
            "qwen" | "dashscope" => Ok(Self::Qwen),
            "openrouter" => Ok(Self::OpenRouter),
            "ollama" => Ok(Self::Ollama),
            other => Err(LlmError::ConfigurationError(format!(
                "Unknown provider: {other}"
            ))),
        }
    }
}

/// Build the adapter for one provider configuration entry
pub fn build_client(
    config: &ProviderConfig,
    policy: ResiliencePolicy,
) -> Result<ProviderClient, LlmError> {
    match config.provider {
        ProviderKind::OpenAi => openai::build(config, policy),
        ProviderKind::Anthropic => anthropic::build(config, policy),
        ProviderKind::Gemini => gemini::build(config, policy),
        ProviderKind::Ollama => ollama::build(config, policy),
        ProviderKind::Mistral
        | ProviderKind::DeepSeek
        | ProviderKind::Qwen
        | ProviderKind::OpenRouter => openai_compatible::build(config, policy),
    }
}

/// Join a base URL and a path without doubling slashes
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
