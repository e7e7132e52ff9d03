//! Transformers for Ollama Chat
//!
//! Non-streaming `/api/chat`; images travel as a base64 list on the message
//! and generation parameters sit under `options`.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::LlmError;
use crate::providers::ProviderKind;
use crate::transformers::request::{RequestTransformer, ensure_model};
use crate::transformers::response::ResponseTransformer;
use crate::types::{FinishReason, GenerationResult, ProviderRequest, Usage};

/// Map an Ollama `done_reason`
pub fn parse_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        None | Some("stop" | "load" | "unload") => FinishReason::Stop,
        Some("length") => FinishReason::Length,
        Some(_) => FinishReason::Error,
    }
}

#[derive(Clone)]
pub struct OllamaRequestTransformer;

impl RequestTransformer for OllamaRequestTransformer {
    fn provider_kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    fn transform_generation(&self, req: &ProviderRequest) -> Result<Value, LlmError> {
        ensure_model(req)?;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &req.system_prompt {
            messages.push(json!({"role": "system", "content": system}));
        }
        let mut user = json!({"role": "user", "content": req.prompt});
        if let Some(image) = &req.image {
            user["images"] = json!([image.base64]);
        }
        messages.push(user);

        let mut body = json!({
            "model": req.model,
            "messages": messages,
            "stream": false,
            // Map max_tokens -> num_predict
            "options": {
                "temperature": req.temperature,
                "num_predict": req.max_tokens,
            },
        });
        if req.structured_output {
            body["format"] = json!("json");
        }
        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    model: Option<String>,
    message: Option<OllamaMessage>,
    done_reason: Option<String>,
    prompt_eval_count: Option<i64>,
    eval_count: Option<i64>,
    total_duration: Option<u64>,
    load_duration: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

#[derive(Clone)]
pub struct OllamaResponseTransformer;

impl ResponseTransformer for OllamaResponseTransformer {
    fn provider_kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    fn transform_generation_response(
        &self,
        raw: &Value,
        requested_model: &str,
    ) -> Result<GenerationResult, LlmError> {
        let response: OllamaChatResponse = serde_json::from_value(raw.clone())
            .map_err(|e| LlmError::ParseError(format!("Invalid Ollama response: {e}")))?;

        let mut metadata = HashMap::new();
        // Durations are reported in nanoseconds
        if let Some(ns) = response.total_duration {
            metadata.insert("total_duration_ms".to_string(), json!(ns / 1_000_000));
        }
        if let Some(ns) = response.load_duration {
            metadata.insert("load_duration_ms".to_string(), json!(ns / 1_000_000));
        }

        Ok(GenerationResult {
            text: response.message.map(|m| m.content).unwrap_or_default(),
            model: response
                .model
                .unwrap_or_else(|| requested_model.to_string()),
            provider: ProviderKind::Ollama,
            usage: Usage::from_counts(response.prompt_eval_count, response.eval_count),
            finish_reason: parse_finish_reason(response.done_reason.as_deref()),
            latency_ms: 0,
            provider_metadata: metadata,
        })
    }
}
