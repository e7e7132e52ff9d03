//! HTTP executor shared by every provider adapter

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{HeaderBuilder, UrlBuilder};
use crate::error::LlmError;
use crate::providers::ProviderKind;
use crate::retry::ResiliencePolicy;
use crate::transformers::{RequestTransformer, ResponseTransformer};
use crate::types::{GenerationResult, ProviderRequest};
use crate::utils::http_headers::format_headers_for_logging;

/// Parsed result plus the vendor JSON it came from (kept for audit)
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub result: GenerationResult,
    pub raw: Value,
}

/// Build the reqwest client used by one adapter
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(30)))
        .build()
        .map_err(|e| LlmError::ConfigurationError(format!("Failed to build HTTP client: {e}")))
}

/// Generic HTTP executor that wires transformers, endpoint hooks and the
/// resilience policy
pub struct HttpExecutor {
    pub provider: ProviderKind,
    client: RwLock<Option<reqwest::Client>>,
    pub request_transformer: Arc<dyn RequestTransformer>,
    pub response_transformer: Arc<dyn ResponseTransformer>,
    // Strategy hooks
    pub build_url: UrlBuilder,
    pub build_headers: HeaderBuilder,
    pub health_url: String,
    pub policy: ResiliencePolicy,
    pub timeout: Duration,
}

impl std::fmt::Debug for HttpExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpExecutor")
            .field("provider", &self.provider)
            .field("policy", &self.policy)
            .field("timeout", &self.timeout)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl HttpExecutor {
    pub fn new(
        provider: ProviderKind,
        client: reqwest::Client,
        request_transformer: Arc<dyn RequestTransformer>,
        response_transformer: Arc<dyn ResponseTransformer>,
        build_url: UrlBuilder,
        build_headers: HeaderBuilder,
    ) -> Self {
        Self {
            provider,
            client: RwLock::new(Some(client)),
            request_transformer,
            response_transformer,
            build_url,
            build_headers,
            health_url: String::new(),
            policy: ResiliencePolicy::default(),
            timeout: provider.default_timeout(),
        }
    }

    pub fn with_health_url(mut self, url: impl Into<String>) -> Self {
        self.health_url = url.into();
        self
    }

    pub fn with_policy(mut self, policy: ResiliencePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn client(&self) -> Result<reqwest::Client, LlmError> {
        let guard = self
            .client
            .read()
            .map_err(|_| LlmError::InternalError("HTTP client lock poisoned".to_string()))?;
        guard.clone().ok_or_else(|| {
            LlmError::ConfigurationError(format!("{} adapter has been closed", self.provider))
        })
    }

    pub fn is_closed(&self) -> bool {
        self.client.read().map(|c| c.is_none()).unwrap_or(true)
    }

    /// Drop the HTTP client. Idempotent.
    pub fn close(&self) {
        if let Ok(mut guard) = self.client.write()
            && guard.take().is_some()
        {
            debug!(provider = %self.provider, "HTTP client released");
        }
    }

    /// One generation call under the resilience policy
    pub async fn execute(&self, request: &ProviderRequest) -> Result<ProviderResponse, LlmError> {
        let body = self.request_transformer.transform_generation(request)?;
        let url = (self.build_url)(&request.model);
        let headers = (self.build_headers)()?;
        let client = self.client()?;

        debug!(
            provider = %self.provider,
            model = %request.model,
            has_image = request.image.is_some(),
            headers = %format_headers_for_logging(&headers),
            "sending generation request"
        );

        // Latency of the attempt that succeeded; retry waits are excluded
        let (raw, latency_ms) = self
            .policy
            .execute(self.provider, || {
                self.send_once(&client, &url, &headers, &body)
            })
            .await?;

        let mut result = self
            .response_transformer
            .transform_generation_response(&raw, &request.model)?;
        result.latency_ms = latency_ms;

        info!(
            provider = %self.provider,
            model = %result.model,
            latency_ms,
            input_tokens = result.usage.input_tokens,
            output_tokens = result.usage.output_tokens,
            finish_reason = ?result.finish_reason,
            "generation completed"
        );
        Ok(ProviderResponse { result, raw })
    }

    async fn send_once(
        &self,
        client: &reqwest::Client,
        url: &str,
        headers: &HeaderMap,
        body: &Value,
    ) -> Result<(Value, u64), LlmError> {
        let started = Instant::now();
        let response = client
            .post(url)
            .headers(headers.clone())
            .timeout(self.timeout)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let response_headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(self.response_transformer.classify_error(
                status.as_u16(),
                &response_headers,
                &text,
            ));
        }

        let text = response.text().await?;
        let raw = serde_json::from_str(&text).map_err(|e| {
            LlmError::ParseError(format!("{} returned invalid JSON: {e}", self.provider))
        })?;
        Ok((raw, started.elapsed().as_millis() as u64))
    }

    /// One GET against the health endpoint, no retries
    pub async fn health_check(&self) -> bool {
        let client = match self.client() {
            Ok(client) => client,
            Err(_) => return false,
        };
        let headers = match (self.build_headers)() {
            Ok(headers) => headers,
            Err(_) => return false,
        };
        match client
            .get(&self.health_url)
            .headers(headers)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!(provider = %self.provider, status = response.status().as_u16(), "health check failed");
                false
            }
            Err(e) => {
                warn!(provider = %self.provider, error = %e.without_url(), "health check failed");
                false
            }
        }
    }
}
