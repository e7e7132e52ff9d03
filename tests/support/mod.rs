//! Shared fixtures for integration tests
#![allow(dead_code)]

use coursegen_ai::prelude::*;
use coursegen_ai::providers::build_client;
use serde_json::{Value, json};

/// Minimal PNG: signature plus an IHDR chunk with the given size
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut out = b"\x89PNG\r\n\x1a\n".to_vec();
    out.extend_from_slice(&13u32.to_be_bytes());
    out.extend_from_slice(b"IHDR");
    out.extend_from_slice(&width.to_be_bytes());
    out.extend_from_slice(&height.to_be_bytes());
    out.extend_from_slice(&[8, 6, 0, 0, 0]);
    out.extend_from_slice(&[0, 0, 0, 0]);
    out
}

/// Vision output as models tend to return it: fenced JSON
pub const FENCED_ANALYSIS: &str = r#"```json
{
  "extracted_text": "fn main() { println!(\"hi\"); }",
  "language": "EN",
  "confidence": 92,
  "course_outline": {
    "title": "Rust Basics",
    "description": "First steps",
    "topics": ["functions", "macros"],
    "learning_objectives": ["write a main function"],
    "difficulty": "Beginner",
    "estimated_duration_minutes": 30
  },
  "visual_elements": [
    {"type": "code", "content": "fn main()", "confidence": 0.97}
  ]
}
```"#;

pub fn chat_completion(content: &str, finish_reason: &str) -> Value {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "model": "gpt-4o-2024-08-06",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": finish_reason
        }],
        "usage": {"prompt_tokens": 120, "completion_tokens": 40, "total_tokens": 160}
    })
}

pub fn anthropic_message(text: &str, stop_reason: &str) -> Value {
    json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "model": "claude-3-5-sonnet-20241022",
        "content": [{"type": "text", "text": text}],
        "stop_reason": stop_reason,
        "usage": {
            "input_tokens": 200,
            "output_tokens": 50,
            "cache_read_input_tokens": 64
        }
    })
}

pub fn gemini_response(text: &str, finish_reason: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": finish_reason
        }],
        "usageMetadata": {
            "promptTokenCount": 30,
            "candidatesTokenCount": 12,
            "thoughtsTokenCount": 7
        },
        "modelVersion": "gemini-1.5-flash-002"
    })
}

pub fn ollama_response(text: &str, done_reason: &str) -> Value {
    json!({
        "model": "llava",
        "message": {"role": "assistant", "content": text},
        "done": true,
        "done_reason": done_reason,
        "prompt_eval_count": 26,
        "eval_count": 290,
        "total_duration": 4_935_886_791u64
    })
}

pub fn error_body(message: &str) -> Value {
    json!({"error": {"message": message, "type": "error", "code": null}})
}

/// Config pointing a vendor at a mock server
pub fn config(kind: ProviderKind, base_url: &str) -> ProviderConfig {
    ProviderConfig::new(kind)
        .with_api_key("test-key")
        .with_base_url(base_url)
}

/// Adapter for `config` with millisecond retry delays
pub fn adapter(config: &ProviderConfig) -> ProviderClient {
    build_client(config, ResiliencePolicy::fast()).expect("adapter builds")
}
