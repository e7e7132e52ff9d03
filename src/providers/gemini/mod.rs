//! Google Gemini provider
//!
//! generateContent with the API key passed as the `key` query parameter.

pub mod transformers;

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use super::{ProviderClient, join_url};
use crate::error::LlmError;
use crate::executors::HttpExecutor;
use crate::executors::http::build_http_client;
use crate::retry::ResiliencePolicy;
use crate::types::ProviderConfig;
use crate::utils::http_headers::json_headers;

pub use transformers::{GeminiRequestTransformer, GeminiResponseTransformer};

/// `{base}/models/{model}:generateContent?key=...`
pub fn generate_url(base_url: &str, model: &str, api_key: &str) -> String {
    let model = model.trim_start_matches("models/");
    format!(
        "{}?key={}",
        join_url(base_url, &format!("models/{model}:generateContent")),
        urlencoding::encode(api_key)
    )
}

pub fn build(config: &ProviderConfig, policy: ResiliencePolicy) -> Result<ProviderClient, LlmError> {
    let key = SecretString::from(config.require_api_key()?.to_string());
    let base_url = config.base_url().to_string();
    let timeout = config.timeout();
    let health_url = format!(
        "{}?key={}",
        join_url(&base_url, "models"),
        urlencoding::encode(key.expose_secret())
    );

    let executor = HttpExecutor::new(
        config.provider,
        build_http_client(timeout)?,
        Arc::new(GeminiRequestTransformer),
        Arc::new(GeminiResponseTransformer),
        Box::new(move |model| generate_url(&base_url, model, key.expose_secret())),
        Box::new(|| Ok(json_headers())),
    )
    .with_health_url(health_url)
    .with_policy(policy.with_max_retries(config.max_retries))
    .with_timeout(timeout);
    Ok(ProviderClient::new(config, executor))
}
