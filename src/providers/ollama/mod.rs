//! Ollama provider (locally hosted)
//!
//! No credential is required; one is sent as a bearer token when configured
//! (for instances behind an authenticating proxy).

pub mod transformers;

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use super::{ProviderClient, join_url};
use crate::error::LlmError;
use crate::executors::HttpExecutor;
use crate::executors::http::build_http_client;
use crate::retry::ResiliencePolicy;
use crate::types::ProviderConfig;
use crate::utils::http_headers::{bearer_headers, json_headers};

pub use transformers::{OllamaRequestTransformer, OllamaResponseTransformer};

pub fn build(config: &ProviderConfig, policy: ResiliencePolicy) -> Result<ProviderClient, LlmError> {
    let key = config
        .api_key()
        .filter(|k| !k.trim().is_empty())
        .map(|k| SecretString::from(k.to_string()));
    let base_url = config.base_url().to_string();
    let timeout = config.timeout();
    let url = join_url(&base_url, "api/chat");

    let executor = HttpExecutor::new(
        config.provider,
        build_http_client(timeout)?,
        Arc::new(OllamaRequestTransformer),
        Arc::new(OllamaResponseTransformer),
        Box::new(move |_model| url.clone()),
        Box::new(move || match &key {
            Some(key) => bearer_headers(key.expose_secret()),
            None => Ok(json_headers()),
        }),
    )
    .with_health_url(join_url(&base_url, "api/tags"))
    .with_policy(policy.with_max_retries(config.max_retries))
    .with_timeout(timeout);
    Ok(ProviderClient::new(config, executor))
}
