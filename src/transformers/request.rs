//! Request transformation traits
//!
//! Converts the uniform `ProviderRequest` into a provider-specific JSON body.

use crate::error::LlmError;
use crate::providers::ProviderKind;
use crate::types::ProviderRequest;

/// Instruction appended to the prompt when a vendor has no native JSON mode
pub const JSON_ONLY_INSTRUCTION: &str =
    "Respond only with a single valid JSON object. Do not add any text before or after it.";

/// Transform a resolved request into a provider-specific payload
pub trait RequestTransformer: Send + Sync {
    fn provider_kind(&self) -> ProviderKind;

    /// Build the JSON body for one generation call
    fn transform_generation(&self, req: &ProviderRequest) -> Result<serde_json::Value, LlmError>;
}

/// Prompt with the JSON-only instruction appended when structured output is
/// requested from a vendor without native JSON mode.
pub fn emulated_json_prompt(req: &ProviderRequest) -> String {
    if req.structured_output {
        format!("{}\n\n{}", req.prompt.trim_end(), JSON_ONLY_INSTRUCTION)
    } else {
        req.prompt.clone()
    }
}

/// Shared sanity checks applied by every transformer
pub fn ensure_model(req: &ProviderRequest) -> Result<(), LlmError> {
    if req.model.trim().is_empty() {
        return Err(LlmError::InvalidParameter(
            "Model must be specified".to_string(),
        ));
    }
    Ok(())
}
