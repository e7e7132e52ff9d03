//! Transformers for the chat completions wire protocol
//!
//! Shared by OpenAI and the OpenAI-compatible vendors; a profile selects the
//! provider identity and whether JSON mode is native.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::LlmError;
use crate::providers::ProviderKind;
use crate::retry::extract_error_message;
use crate::transformers::request::{
    JSON_ONLY_INSTRUCTION, RequestTransformer, emulated_json_prompt, ensure_model,
};
use crate::transformers::response::ResponseTransformer;
use crate::types::{FinishReason, GenerationResult, ProviderRequest, Usage};

/// Wire-level differences between chat completions vendors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatCompletionsProfile {
    pub provider: ProviderKind,
    /// `response_format: {"type": "json_object"}` is accepted
    pub native_json: bool,
}

impl ChatCompletionsProfile {
    pub const fn new(provider: ProviderKind, native_json: bool) -> Self {
        Self {
            provider,
            native_json,
        }
    }
}

/// Map a chat completions `finish_reason`
pub fn parse_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        None | Some("stop" | "tool_calls" | "function_call" | "eos") => FinishReason::Stop,
        Some("length") => FinishReason::Length,
        Some("content_filter") => FinishReason::ContentFilter,
        Some(_) => FinishReason::Error,
    }
}

#[derive(Clone)]
pub struct ChatCompletionsRequestTransformer {
    pub profile: ChatCompletionsProfile,
}

impl RequestTransformer for ChatCompletionsRequestTransformer {
    fn provider_kind(&self) -> ProviderKind {
        self.profile.provider
    }

    fn transform_generation(&self, req: &ProviderRequest) -> Result<Value, LlmError> {
        ensure_model(req)?;
        let native_json = req.structured_output && self.profile.native_json;
        let prompt = if native_json {
            req.prompt.clone()
        } else {
            emulated_json_prompt(req)
        };

        let mut messages = Vec::with_capacity(2);
        let mut system = req.system_prompt.clone();
        // JSON mode rejects conversations that never mention JSON
        if native_json {
            let mentions_json = prompt.to_lowercase().contains("json")
                || system
                    .as_deref()
                    .is_some_and(|s| s.to_lowercase().contains("json"));
            if !mentions_json {
                system = Some(match system {
                    Some(s) => format!("{s}\n\n{JSON_ONLY_INSTRUCTION}"),
                    None => JSON_ONLY_INSTRUCTION.to_string(),
                });
            }
        }
        if let Some(system) = system {
            messages.push(json!({"role": "system", "content": system}));
        }
        let content = match &req.image {
            Some(image) => json!([
                {"type": "text", "text": prompt},
                {"type": "image_url", "image_url": {"url": image.data_uri()}}
            ]),
            None => json!(prompt),
        };
        messages.push(json!({"role": "user", "content": content}));

        let mut body = json!({
            "model": req.model,
            "messages": messages,
            "max_tokens": req.max_tokens,
            "temperature": req.temperature,
        });
        if native_json {
            body["response_format"] = json!({"type": "json_object"});
        }
        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    id: Option<String>,
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Value,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: Option<i64>,
    completion_tokens: Option<i64>,
    cost: Option<f64>,
    prompt_cache_hit_tokens: Option<i64>,
    prompt_tokens_details: Option<Value>,
    completion_tokens_details: Option<Value>,
}

/// Text of a message whose content is a string or an array of text parts
fn content_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(""),
        _ => String::new(),
    }
}

#[derive(Clone)]
pub struct ChatCompletionsResponseTransformer {
    pub profile: ChatCompletionsProfile,
}

impl ResponseTransformer for ChatCompletionsResponseTransformer {
    fn provider_kind(&self) -> ProviderKind {
        self.profile.provider
    }

    fn transform_generation_response(
        &self,
        raw: &Value,
        requested_model: &str,
    ) -> Result<GenerationResult, LlmError> {
        let provider = self.profile.provider;
        let response: ChatCompletionResponse = serde_json::from_value(raw.clone())
            .map_err(|e| LlmError::ParseError(format!("Invalid {provider} response: {e}")))?;

        let Some(choice) = response.choices.into_iter().next() else {
            // Some gateways report upstream failures inside a 200 body
            if let Some(err) = raw.get("error") {
                let code = err
                    .get("code")
                    .and_then(Value::as_u64)
                    .and_then(|c| u16::try_from(c).ok())
                    .unwrap_or(502);
                let message =
                    extract_error_message(raw).unwrap_or_else(|| "upstream error".to_string());
                return Err(LlmError::response_error_with_details(
                    code,
                    format!("provider={provider} {message}"),
                    raw.clone(),
                ));
            }
            return Err(LlmError::ParseError(format!(
                "{provider} response contained no choices"
            )));
        };

        let text = choice
            .message
            .as_ref()
            .map(|m| content_text(&m.content))
            .unwrap_or_default();

        let mut metadata = HashMap::new();
        if let Some(id) = response.id {
            metadata.insert("id".to_string(), json!(id));
        }
        let usage = match response.usage {
            Some(u) => {
                if let Some(cost) = u.cost {
                    metadata.insert("cost".to_string(), json!(cost));
                }
                if let Some(hit) = u.prompt_cache_hit_tokens {
                    metadata.insert("cache_hit_tokens".to_string(), json!(hit));
                }
                if let Some(cached) = u
                    .prompt_tokens_details
                    .as_ref()
                    .and_then(|d| d.get("cached_tokens"))
                    .and_then(Value::as_i64)
                {
                    metadata.insert("cached_tokens".to_string(), json!(cached));
                }
                if let Some(reasoning) = u
                    .completion_tokens_details
                    .as_ref()
                    .and_then(|d| d.get("reasoning_tokens"))
                    .and_then(Value::as_i64)
                {
                    metadata.insert("reasoning_tokens".to_string(), json!(reasoning));
                }
                Usage::from_counts(u.prompt_tokens, u.completion_tokens)
            }
            None => Usage::default(),
        };

        Ok(GenerationResult {
            text,
            model: response
                .model
                .unwrap_or_else(|| requested_model.to_string()),
            provider,
            usage,
            finish_reason: parse_finish_reason(choice.finish_reason.as_deref()),
            latency_ms: 0,
            provider_metadata: metadata,
        })
    }
}
