//! `ProviderAdapter` implementation shared by every vendor
//!
//! Vendors differ only in the transformers and endpoint hooks installed in
//! the executor; validation, model selection and vision parsing live here.

use async_trait::async_trait;
use validator::Validate;

use super::ProviderKind;
use crate::analysis::parse_vision_analysis;
use crate::error::LlmError;
use crate::executors::HttpExecutor;
use crate::prompts::VISION_SYSTEM_PROMPT;
use crate::traits::{ProviderAdapter, ProviderCapabilities};
use crate::types::{
    EncodedImage, GenerationRequest, GenerationResult, ImageInput, ImageMetadata, ProviderConfig,
    ProviderRequest, VisionAnalysis, VisionRequest,
};
use crate::utils::inspect;

#[derive(Debug)]
pub struct ProviderClient {
    kind: ProviderKind,
    capabilities: ProviderCapabilities,
    executor: HttpExecutor,
    text_model: String,
    vision_model: String,
}

impl ProviderClient {
    pub fn new(config: &ProviderConfig, executor: HttpExecutor) -> Self {
        Self {
            kind: config.provider,
            capabilities: config.provider.capabilities(),
            executor,
            text_model: config.text_model().to_string(),
            vision_model: config.vision_model().to_string(),
        }
    }

    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    pub fn vision_model(&self) -> &str {
        &self.vision_model
    }

    pub fn executor(&self) -> &HttpExecutor {
        &self.executor
    }

    fn require_vision(&self) -> Result<(), LlmError> {
        if self.capabilities.vision {
            Ok(())
        } else {
            Err(LlmError::VisionUnsupported {
                provider: self.kind,
            })
        }
    }

    /// Validate against the capability descriptor and encode for the wire
    fn prepare_image(&self, input: &ImageInput) -> Result<(EncodedImage, ImageMetadata), LlmError> {
        self.require_vision()?;
        let bytes = input.to_bytes()?;
        let format = self.capabilities.check_image(&bytes)?;
        Ok((EncodedImage::new(format, &bytes), inspect(&bytes)))
    }

    fn clamp_tokens(&self, requested: u32) -> u32 {
        match self.capabilities.max_tokens {
            0 => requested,
            limit => requested.min(limit),
        }
    }
}

#[async_trait]
impl ProviderAdapter for ProviderClient {
    fn provider_kind(&self) -> ProviderKind {
        self.kind
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.capabilities.clone()
    }

    async fn analyze_image(&self, request: VisionRequest) -> Result<VisionAnalysis, LlmError> {
        let (image, metadata) = self.prepare_image(&request.image)?;
        let provider_request = ProviderRequest {
            model: request.model.unwrap_or_else(|| self.vision_model.clone()),
            prompt: request.prompt,
            system_prompt: Some(VISION_SYSTEM_PROMPT.to_string()),
            image: Some(image),
            max_tokens: self.clamp_tokens(request.max_tokens),
            temperature: request.temperature,
            structured_output: true,
        };
        let response = self.executor.execute(&provider_request).await?;
        Ok(parse_vision_analysis(response.result, response.raw).with_image_metadata(metadata))
    }

    async fn generate_text(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResult, LlmError> {
        request
            .validate()
            .map_err(|e| LlmError::InvalidParameter(e.to_string()))?;
        let image = match &request.image {
            Some(input) => Some(self.prepare_image(input)?.0),
            None => None,
        };
        let model = request.model.unwrap_or_else(|| {
            if image.is_some() {
                self.vision_model.clone()
            } else {
                self.text_model.clone()
            }
        });
        let provider_request = ProviderRequest {
            model,
            prompt: request.prompt,
            system_prompt: request.system_prompt,
            image,
            max_tokens: self.clamp_tokens(request.max_tokens),
            temperature: request.temperature,
            structured_output: request.structured_output,
        };
        Ok(self.executor.execute(&provider_request).await?.result)
    }

    async fn health_check(&self) -> bool {
        self.executor.health_check().await
    }

    async fn close(&self) {
        self.executor.close();
    }
}
