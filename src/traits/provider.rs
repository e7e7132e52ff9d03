//! Adapter contract implemented by every provider

use async_trait::async_trait;

use super::capabilities::ProviderCapabilities;
use crate::error::LlmError;
use crate::providers::ProviderKind;
use crate::types::{GenerationRequest, GenerationResult, VisionAnalysis, VisionRequest};

/// Uniform generation contract.
///
/// Adapters own no tenant state beyond their HTTP client; tenant selection
/// lives in the registry.
#[async_trait]
pub trait ProviderAdapter: Send + Sync + std::fmt::Debug {
    fn provider_kind(&self) -> ProviderKind;

    /// Static capability descriptor; no I/O.
    fn capabilities(&self) -> ProviderCapabilities;

    /// Analyze one image.
    ///
    /// Fails with `UnsupportedFormat` or `PayloadTooLarge` before any network
    /// call when the image does not fit the capability descriptor.
    async fn analyze_image(&self, request: VisionRequest) -> Result<VisionAnalysis, LlmError>;

    async fn generate_text(&self, request: GenerationRequest)
    -> Result<GenerationResult, LlmError>;

    /// One lightweight call; never fails, network errors report `false`.
    async fn health_check(&self) -> bool;

    /// Release the HTTP client. Repeated calls are no-ops.
    async fn close(&self);
}
