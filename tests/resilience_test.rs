//! Retry behaviour of adapters against a misbehaving vendor
//!
//! Every adapter is built with `ResiliencePolicy::fast()`, so waits are in
//! milliseconds while the retry budget stays the production one.

mod support;

use coursegen_ai::prelude::*;
use serde_json::json;
use std::time::Duration;
use support::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn chat_server() -> MockServer {
    MockServer::start().await
}

#[tokio::test]
async fn rate_limit_is_retried_after_hint() {
    let server = chat_server().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "0")
                .set_body_json(error_body("Rate limit reached")),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("done", "stop")))
        .mount(&server)
        .await;

    let client = adapter(&config(ProviderKind::OpenAi, &server.uri()));
    let result = client
        .generate_text(GenerationRequest::new("hi"))
        .await
        .unwrap();
    assert_eq!(result.text, "done");
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn server_errors_exhaust_retry_budget() {
    let server = chat_server().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_json(error_body("boom")))
        .expect(3)
        .mount(&server)
        .await;

    let client = adapter(&config(ProviderKind::Mistral, &server.uri()));
    let err = client
        .generate_text(GenerationRequest::new("hi"))
        .await
        .unwrap_err();
    match err {
        LlmError::ResponseError { code, message, .. } => {
            assert_eq!(code, 500);
            assert!(message.contains("boom"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn retry_budget_follows_provider_config() {
    let server = chat_server().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(ProviderKind::Qwen, &server.uri()).with_max_retries(0);
    let err = adapter(&config)
        .generate_text(GenerationRequest::new("hi"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(503));
}

#[tokio::test]
async fn authentication_failure_is_not_retried() {
    let server = chat_server().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(error_body("Incorrect API key provided")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = adapter(&config(ProviderKind::DeepSeek, &server.uri()))
        .generate_text(GenerationRequest::new("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::AuthenticationError(ref msg) if msg.contains("Incorrect API key")));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn bad_request_is_not_retried() {
    let server = chat_server().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "type": "error",
            "error": {"type": "invalid_request_error", "message": "max_tokens: too large"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = adapter(&config(ProviderKind::Anthropic, &server.uri()))
        .generate_text(GenerationRequest::new("hi"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(400));
    assert!(err.to_string().contains("max_tokens: too large"));
}

#[tokio::test]
async fn exhausted_rate_limit_reports_default_wait() {
    let server = chat_server().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(error_body("slow down")))
        .expect(3)
        .mount(&server)
        .await;

    let err = adapter(&config(ProviderKind::OpenRouter, &server.uri()))
        .generate_text(GenerationRequest::new("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::RateLimitError { .. }));
    assert_eq!(err.retry_after(), Some(Duration::from_millis(1)));
}

#[tokio::test]
async fn gemini_invalid_key_is_an_authentication_error() {
    let server = chat_server().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT",
                "details": [{"reason": "API_KEY_INVALID"}]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = adapter(&config(ProviderKind::Gemini, &server.uri()))
        .generate_text(GenerationRequest::new("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::AuthenticationError(_)));
}

#[tokio::test]
async fn malformed_success_body_is_a_parse_error() {
    let server = chat_server().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig::new(ProviderKind::Ollama).with_base_url(server.uri());
    let err = adapter(&config)
        .generate_text(GenerationRequest::new("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::ParseError(_)));
}

#[tokio::test]
async fn connection_errors_do_not_expose_query_credentials() {
    // Nothing listens on the discard port
    let config = ProviderConfig::new(ProviderKind::Gemini)
        .with_api_key("AIzaSECRETKEY123456")
        .with_base_url("http://127.0.0.1:9");
    let err = adapter(&config)
        .generate_text(GenerationRequest::new("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::ConnectionError { .. }));
    assert!(!err.to_string().contains("SECRETKEY"));
    assert!(!format!("{err:?}").contains("SECRETKEY"));
}

#[tokio::test]
async fn latency_excludes_retry_waits() {
    let server = chat_server().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "1")
                .set_body_json(error_body("Rate limit reached")),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("done", "stop")))
        .mount(&server)
        .await;

    let started = std::time::Instant::now();
    let result = adapter(&config(ProviderKind::OpenAi, &server.uri()))
        .generate_text(GenerationRequest::new("hi"))
        .await
        .unwrap();
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert!(result.latency_ms < 1000, "latency {}ms", result.latency_ms);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}
