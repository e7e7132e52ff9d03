//! HTTP failure classification shared by every adapter

use reqwest::header::HeaderMap;
use serde_json::Value;

use crate::error::LlmError;
use crate::providers::ProviderKind;
use crate::utils::http_headers::parse_retry_after;

const REQUEST_ID_HEADERS: [&str; 5] = [
    "x-request-id",
    "request-id",
    "x-goog-request-id",
    "x-trace-id",
    "traceparent",
];

fn request_ids(headers: &HeaderMap) -> String {
    let ids: Vec<String> = REQUEST_ID_HEADERS
        .iter()
        .filter_map(|name| {
            headers
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .map(|v| format!("{name}={v}"))
        })
        .collect();
    if ids.is_empty() {
        String::new()
    } else {
        format!(" ids=[{}]", ids.join(","))
    }
}

/// Pull the human-readable message out of common vendor error envelopes:
/// `{"error": {"message": ..}}`, `{"error": ".."}`, `{"message": ..}`,
/// `{"detail": ..}` and Gemini's list form `[{"error": {..}}]`.
pub fn extract_error_message(body: &Value) -> Option<String> {
    let body = match body {
        Value::Array(items) => items.first()?,
        other => other,
    };
    match body.get("error") {
        Some(Value::String(s)) => return Some(s.clone()),
        Some(err) => {
            if let Some(msg) = err.get("message").and_then(Value::as_str) {
                return Some(msg.to_string());
            }
        }
        None => {}
    }
    ["message", "detail"]
        .iter()
        .find_map(|k| body.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

/// Map a non-success HTTP status to an `LlmError`.
///
/// 401/403 become `AuthenticationError`, 429 becomes `RateLimitError` with
/// the `Retry-After` hint, everything else a `ResponseError` carrying the
/// parsed body as details.
pub fn classify_http_error(
    provider: ProviderKind,
    status: u16,
    headers: &HeaderMap,
    body_text: &str,
) -> LlmError {
    let parsed: Option<Value> = serde_json::from_str(body_text).ok();
    let ids = request_ids(headers);
    let message = parsed
        .as_ref()
        .and_then(extract_error_message)
        .unwrap_or_else(|| {
            let sample: String = body_text.chars().take(200).collect();
            if sample.trim().is_empty() {
                reqwest::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                sample
            }
        });

    match status {
        401 | 403 => LlmError::AuthenticationError(format!(
            "provider={provider} http={status}{ids} {message}"
        )),
        429 => LlmError::rate_limited(
            format!("provider={provider} http=429{ids} {message}"),
            parse_retry_after(headers),
        ),
        _ => {
            let message = format!("provider={provider}{ids} {message}");
            match parsed {
                Some(details) => LlmError::response_error_with_details(status, message, details),
                None => LlmError::response_error(status, message),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, RETRY_AFTER};
    use std::time::Duration;

    #[test]
    fn auth_statuses() {
        for status in [401, 403] {
            let err = classify_http_error(
                ProviderKind::OpenAi,
                status,
                &HeaderMap::new(),
                r#"{"error":{"message":"Incorrect API key provided"}}"#,
            );
            match err {
                LlmError::AuthenticationError(msg) => {
                    assert!(msg.contains("Incorrect API key provided"))
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn rate_limit_keeps_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        headers.insert("x-request-id", HeaderValue::from_static("req_1"));
        let err = classify_http_error(ProviderKind::Anthropic, 429, &headers, "");
        assert_eq!(err.retry_after(), Some(Duration::from_secs(12)));
        assert!(err.to_string().contains("x-request-id=req_1"));
    }

    #[test]
    fn server_error_carries_details() {
        let err = classify_http_error(
            ProviderKind::Gemini,
            503,
            &HeaderMap::new(),
            r#"[{"error":{"code":503,"message":"The model is overloaded."}}]"#,
        );
        match err {
            LlmError::ResponseError {
                code,
                message,
                details,
            } => {
                assert_eq!(code, 503);
                assert!(message.contains("overloaded"));
                assert!(details.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn non_json_body_uses_sample_or_reason() {
        let err = classify_http_error(ProviderKind::Ollama, 502, &HeaderMap::new(), "bad gateway");
        assert!(err.to_string().contains("bad gateway"));

        let err = classify_http_error(ProviderKind::Ollama, 404, &HeaderMap::new(), "");
        assert!(err.to_string().contains("Not Found"));
        assert_eq!(err.status_code(), Some(404));
    }

    #[test]
    fn extracts_common_envelopes() {
        let cases = [
            (serde_json::json!({"error": "boom"}), "boom"),
            (serde_json::json!({"message": "m"}), "m"),
            (serde_json::json!({"detail": "d"}), "d"),
            (serde_json::json!({"error": {"message": "nested"}}), "nested"),
        ];
        for (body, expected) in cases {
            assert_eq!(extract_error_message(&body).as_deref(), Some(expected));
        }
        assert!(extract_error_message(&serde_json::json!({"x": 1})).is_none());
    }
}
