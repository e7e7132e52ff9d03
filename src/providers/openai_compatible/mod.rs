//! OpenAI-Compatible Providers
//!
//! Mistral, DeepSeek, Qwen (DashScope compatible mode) and OpenRouter speak
//! the chat completions protocol with bearer authentication. They differ in
//! base URL, JSON-mode support and, for OpenRouter, attribution headers.

use super::openai::{ChatCompletionsProfile, bearer_header_builder, chat_completions_executor};
use super::{ProviderClient, ProviderKind};
use crate::error::LlmError;
use crate::executors::HeaderBuilder;
use crate::retry::ResiliencePolicy;
use crate::types::ProviderConfig;
use crate::utils::http_headers::insert_header;

/// Application name reported to OpenRouter
pub const OPENROUTER_APP_TITLE: &str = "coursegen-ai";

/// Chat completions profile for a compatible vendor
pub fn profile(kind: ProviderKind) -> Result<ChatCompletionsProfile, LlmError> {
    match kind {
        ProviderKind::Mistral | ProviderKind::DeepSeek | ProviderKind::Qwen => {
            Ok(ChatCompletionsProfile::new(kind, true))
        }
        // Not every routed model honours response_format
        ProviderKind::OpenRouter => Ok(ChatCompletionsProfile::new(kind, false)),
        other => Err(LlmError::ConfigurationError(format!(
            "{other} is not an OpenAI-compatible provider"
        ))),
    }
}

fn openrouter_header_builder(config: &ProviderConfig) -> Result<HeaderBuilder, LlmError> {
    let bearer = bearer_header_builder(config)?;
    Ok(Box::new(move || {
        let mut headers = bearer()?;
        insert_header(&mut headers, "http-referer", OPENROUTER_APP_TITLE)?;
        insert_header(&mut headers, "x-title", OPENROUTER_APP_TITLE)?;
        Ok(headers)
    }))
}

pub fn build(config: &ProviderConfig, policy: ResiliencePolicy) -> Result<ProviderClient, LlmError> {
    let profile = profile(config.provider)?;
    let headers = match config.provider {
        ProviderKind::OpenRouter => openrouter_header_builder(config)?,
        _ => bearer_header_builder(config)?,
    };
    let executor = chat_completions_executor(config, profile, headers, policy)?;
    Ok(ProviderClient::new(config, executor))
}
