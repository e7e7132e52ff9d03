//! Transformers for the Gemini generateContent API

use std::collections::HashMap;

use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::LlmError;
use crate::providers::ProviderKind;
use crate::retry::classify_http_error;
use crate::transformers::request::{RequestTransformer, ensure_model};
use crate::transformers::response::ResponseTransformer;
use crate::types::{FinishReason, GenerationResult, ProviderRequest, Usage};

/// Map a Gemini `finishReason`
pub fn parse_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        None | Some("STOP" | "FINISH_REASON_UNSPECIFIED") => FinishReason::Stop,
        Some("MAX_TOKENS") => FinishReason::Length,
        Some(
            "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII"
            | "IMAGE_SAFETY",
        ) => FinishReason::ContentFilter,
        Some(_) => FinishReason::Error,
    }
}

#[derive(Clone, Default)]
pub struct GeminiRequestTransformer;

impl RequestTransformer for GeminiRequestTransformer {
    fn provider_kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn transform_generation(&self, req: &ProviderRequest) -> Result<Value, LlmError> {
        ensure_model(req)?;
        let mut parts = Vec::with_capacity(2);
        if let Some(image) = &req.image {
            parts.push(json!({
                "inline_data": {"mime_type": image.mime_type(), "data": image.base64}
            }));
        }
        parts.push(json!({"text": req.prompt}));

        let mut generation_config = json!({
            "maxOutputTokens": req.max_tokens,
            "temperature": req.temperature,
        });
        if req.structured_output {
            generation_config["responseMimeType"] = json!("application/json");
        }

        let mut body = json!({
            "contents": [{"role": "user", "parts": parts}],
            "generationConfig": generation_config,
        });
        if let Some(system) = &req.system_prompt {
            body["systemInstruction"] = json!({"parts": [{"text": system}]});
        }
        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<i64>,
    candidates_token_count: Option<i64>,
    thoughts_token_count: Option<i64>,
    cached_content_token_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Clone, Default)]
pub struct GeminiResponseTransformer;

impl ResponseTransformer for GeminiResponseTransformer {
    fn provider_kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn transform_generation_response(
        &self,
        raw: &Value,
        requested_model: &str,
    ) -> Result<GenerationResult, LlmError> {
        let response: GenerateContentResponse = serde_json::from_value(raw.clone())
            .map_err(|e| LlmError::ParseError(format!("Invalid Gemini response: {e}")))?;

        let mut metadata = HashMap::new();
        let (text, finish_reason) = match response.candidates.first() {
            Some(candidate) => {
                let text = candidate
                    .content
                    .as_ref()
                    .map(|c| {
                        c.parts
                            .iter()
                            .filter(|p| !p.thought)
                            .filter_map(|p| p.text.as_deref())
                            .collect::<Vec<_>>()
                            .join("")
                    })
                    .unwrap_or_default();
                (text, parse_finish_reason(candidate.finish_reason.as_deref()))
            }
            // Prompt blocked before generation
            None => match response.prompt_feedback.and_then(|f| f.block_reason) {
                Some(reason) => {
                    metadata.insert("block_reason".to_string(), json!(reason));
                    (String::new(), FinishReason::ContentFilter)
                }
                None => {
                    return Err(LlmError::ParseError(
                        "Gemini response contained no candidates".to_string(),
                    ));
                }
            },
        };

        let usage = match response.usage_metadata {
            Some(u) => {
                if let Some(n) = u.thoughts_token_count {
                    metadata.insert("thoughts_token_count".to_string(), json!(n));
                }
                if let Some(n) = u.cached_content_token_count {
                    metadata.insert("cached_content_token_count".to_string(), json!(n));
                }
                Usage::from_counts(u.prompt_token_count, u.candidates_token_count)
            }
            None => Usage::default(),
        };

        Ok(GenerationResult {
            text,
            model: response
                .model_version
                .unwrap_or_else(|| requested_model.to_string()),
            provider: ProviderKind::Gemini,
            usage,
            finish_reason,
            latency_ms: 0,
            provider_metadata: metadata,
        })
    }

    /// Gemini reports a bad key as 400 INVALID_ARGUMENT
    fn classify_error(&self, status: u16, headers: &HeaderMap, body: &str) -> LlmError {
        if status == 400 && (body.contains("API_KEY_INVALID") || body.contains("API key not valid"))
        {
            return LlmError::AuthenticationError(
                "provider=gemini http=400 API key not valid".to_string(),
            );
        }
        classify_http_error(ProviderKind::Gemini, status, headers, body)
    }
}
