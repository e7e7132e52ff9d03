//! Anthropic provider
//!
//! Messages API authenticated with the `x-api-key` header.

pub mod transformers;

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use super::{ProviderClient, join_url};
use crate::error::LlmError;
use crate::executors::HttpExecutor;
use crate::executors::http::build_http_client;
use crate::retry::ResiliencePolicy;
use crate::types::ProviderConfig;
use crate::utils::http_headers::{api_key_header, insert_header};

pub use transformers::{AnthropicRequestTransformer, AnthropicResponseTransformer};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

pub fn build(config: &ProviderConfig, policy: ResiliencePolicy) -> Result<ProviderClient, LlmError> {
    let key = SecretString::from(config.require_api_key()?.to_string());
    let base_url = config.base_url().to_string();
    let timeout = config.timeout();
    let url = join_url(&base_url, "messages");

    let executor = HttpExecutor::new(
        config.provider,
        build_http_client(timeout)?,
        Arc::new(AnthropicRequestTransformer),
        Arc::new(AnthropicResponseTransformer),
        Box::new(move |_model| url.clone()),
        Box::new(move || {
            let mut headers = api_key_header("x-api-key", key.expose_secret())?;
            insert_header(&mut headers, "anthropic-version", ANTHROPIC_VERSION)?;
            Ok(headers)
        }),
    )
    .with_health_url(join_url(&base_url, "models"))
    .with_policy(policy.with_max_retries(config.max_retries))
    .with_timeout(timeout);
    Ok(ProviderClient::new(config, executor))
}
