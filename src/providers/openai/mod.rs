//! OpenAI provider
//!
//! Chat completions with bearer authentication. The helpers here are reused
//! by every OpenAI-compatible vendor.

pub mod transformers;

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use super::{ProviderClient, join_url};
use crate::error::LlmError;
use crate::executors::http::build_http_client;
use crate::executors::{HeaderBuilder, HttpExecutor};
use crate::retry::ResiliencePolicy;
use crate::types::ProviderConfig;
use crate::utils::http_headers::bearer_headers;

pub use transformers::{
    ChatCompletionsProfile, ChatCompletionsRequestTransformer, ChatCompletionsResponseTransformer,
};

/// Bearer header builder holding the credential as a secret
pub(crate) fn bearer_header_builder(config: &ProviderConfig) -> Result<HeaderBuilder, LlmError> {
    let key = SecretString::from(config.require_api_key()?.to_string());
    Ok(Box::new(move || bearer_headers(key.expose_secret())))
}

/// Executor for a chat completions endpoint at `{base_url}/chat/completions`
pub(crate) fn chat_completions_executor(
    config: &ProviderConfig,
    profile: ChatCompletionsProfile,
    build_headers: HeaderBuilder,
    policy: ResiliencePolicy,
) -> Result<HttpExecutor, LlmError> {
    let base_url = config.base_url().to_string();
    let timeout = config.timeout();
    let url = join_url(&base_url, "chat/completions");
    Ok(HttpExecutor::new(
        config.provider,
        build_http_client(timeout)?,
        Arc::new(ChatCompletionsRequestTransformer { profile }),
        Arc::new(ChatCompletionsResponseTransformer { profile }),
        Box::new(move |_model| url.clone()),
        build_headers,
    )
    .with_health_url(join_url(&base_url, "models"))
    .with_policy(policy.with_max_retries(config.max_retries))
    .with_timeout(timeout))
}

pub fn build(config: &ProviderConfig, policy: ResiliencePolicy) -> Result<ProviderClient, LlmError> {
    let profile = ChatCompletionsProfile::new(config.provider, true);
    let executor =
        chat_completions_executor(config, profile, bearer_header_builder(config)?, policy)?;
    Ok(ProviderClient::new(config, executor))
}
