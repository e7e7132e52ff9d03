//! Response transformation traits
//!
//! Converts provider responses into the unified `GenerationResult`.

use reqwest::header::HeaderMap;

use crate::error::LlmError;
use crate::providers::ProviderKind;
use crate::retry::classify_http_error;
use crate::types::GenerationResult;

/// Transform provider-specific responses into unified results
pub trait ResponseTransformer: Send + Sync {
    fn provider_kind(&self) -> ProviderKind;

    /// Parse a successful response body. `requested_model` is reported when
    /// the vendor omits the model name. Latency is filled in by the executor.
    fn transform_generation_response(
        &self,
        raw: &serde_json::Value,
        requested_model: &str,
    ) -> Result<GenerationResult, LlmError>;

    /// Map a non-success HTTP response to an error
    fn classify_error(&self, status: u16, headers: &HeaderMap, body: &str) -> LlmError {
        classify_http_error(self.provider_kind(), status, headers, body)
    }
}
