//! Transformers for Anthropic Messages API

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::LlmError;
use crate::providers::ProviderKind;
use crate::transformers::request::{RequestTransformer, emulated_json_prompt, ensure_model};
use crate::transformers::response::ResponseTransformer;
use crate::types::{FinishReason, GenerationResult, ProviderRequest, Usage};

/// Map an Anthropic `stop_reason`
pub fn parse_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        None | Some("end_turn" | "stop_sequence" | "tool_use" | "pause_turn") => {
            FinishReason::Stop
        }
        Some("max_tokens") => FinishReason::Length,
        Some("refusal") => FinishReason::ContentFilter,
        Some(_) => FinishReason::Error,
    }
}

/// Request transformer for Anthropic
#[derive(Clone, Default)]
pub struct AnthropicRequestTransformer;

impl RequestTransformer for AnthropicRequestTransformer {
    fn provider_kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn transform_generation(&self, req: &ProviderRequest) -> Result<Value, LlmError> {
        ensure_model(req)?;
        // No native JSON mode
        let prompt = emulated_json_prompt(req);

        let mut content = Vec::with_capacity(2);
        if let Some(image) = &req.image {
            content.push(json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": image.mime_type(),
                    "data": image.base64,
                }
            }));
        }
        content.push(json!({"type": "text", "text": prompt}));

        let mut body = json!({
            "model": req.model,
            "max_tokens": req.max_tokens,
            // Anthropic accepts 0.0..=1.0
            "temperature": req.temperature.clamp(0.0, 1.0),
            "messages": [{"role": "user", "content": content}],
        });
        if let Some(system) = &req.system_prompt {
            body["system"] = json!(system);
        }
        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    id: Option<String>,
    model: Option<String>,
    #[serde(default)]
    content: Vec<AnthropicContentBlock>,
    stop_reason: Option<String>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: Option<i64>,
    output_tokens: Option<i64>,
    cache_creation_input_tokens: Option<i64>,
    cache_read_input_tokens: Option<i64>,
}

/// Response transformer for Anthropic
#[derive(Clone, Default)]
pub struct AnthropicResponseTransformer;

impl ResponseTransformer for AnthropicResponseTransformer {
    fn provider_kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn transform_generation_response(
        &self,
        raw: &Value,
        requested_model: &str,
    ) -> Result<GenerationResult, LlmError> {
        let response: AnthropicResponse = serde_json::from_value(raw.clone())
            .map_err(|e| LlmError::ParseError(format!("Invalid Anthropic response: {e}")))?;

        let text = response
            .content
            .iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        let mut metadata = HashMap::new();
        if let Some(id) = response.id {
            metadata.insert("id".to_string(), json!(id));
        }
        let usage = match response.usage {
            Some(u) => {
                if let Some(n) = u.cache_creation_input_tokens {
                    metadata.insert("cache_creation_input_tokens".to_string(), json!(n));
                }
                if let Some(n) = u.cache_read_input_tokens {
                    metadata.insert("cache_read_input_tokens".to_string(), json!(n));
                }
                Usage::from_counts(u.input_tokens, u.output_tokens)
            }
            None => Usage::default(),
        };

        Ok(GenerationResult {
            text,
            model: response
                .model
                .unwrap_or_else(|| requested_model.to_string()),
            provider: ProviderKind::Anthropic,
            usage,
            finish_reason: parse_finish_reason(response.stop_reason.as_deref()),
            latency_ms: 0,
            provider_metadata: metadata,
        })
    }
}
