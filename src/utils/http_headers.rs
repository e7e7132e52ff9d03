//! HTTP header helpers shared by the provider adapters

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};

use crate::error::LlmError;

fn header_value(value: &str) -> Result<HeaderValue, LlmError> {
    HeaderValue::from_str(value)
        .map_err(|e| LlmError::ConfigurationError(format!("Invalid header value: {e}")))
}

/// JSON content type only (local runtimes, key-in-query vendors)
pub fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

/// `Authorization: Bearer <key>` plus JSON content type
pub fn bearer_headers(api_key: &str) -> Result<HeaderMap, LlmError> {
    let mut headers = json_headers();
    let mut auth = header_value(&format!("Bearer {api_key}"))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);
    Ok(headers)
}

/// Credential sent in a vendor-specific header (e.g. `x-api-key`)
pub fn api_key_header(name: &'static str, api_key: &str) -> Result<HeaderMap, LlmError> {
    let mut headers = json_headers();
    let mut value = header_value(api_key)?;
    value.set_sensitive(true);
    headers.insert(HeaderName::from_static(name), value);
    Ok(headers)
}

/// Add a plain (non-secret) header
pub fn insert_header(
    headers: &mut HeaderMap,
    name: &'static str,
    value: &str,
) -> Result<(), LlmError> {
    headers.insert(HeaderName::from_static(name), header_value(value)?);
    Ok(())
}

/// Parse `Retry-After` as delta-seconds or an HTTP-date.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    if let Ok(secs) = raw.parse::<f64>() {
        // Negative, NaN and overflowing values are treated as absent
        return Duration::try_from_secs_f64(secs).ok();
    }
    let date = chrono::DateTime::parse_from_rfc2822(raw).ok()?;
    let delta = date.with_timezone(&chrono::Utc) - chrono::Utc::now();
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}

/// Mask a secret for logs, keeping a short prefix and suffix
pub fn mask_sensitive_value(value: &str) -> String {
    if let Some(token) = value.strip_prefix("Bearer ") {
        return format!("Bearer {}", mask_sensitive_value(token));
    }
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 12 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "***".to_string()
    }
}

/// Render headers for debug logging with credentials masked
pub fn format_headers_for_logging(headers: &HeaderMap) -> String {
    let rendered: Vec<String> = headers
        .iter()
        .map(|(k, v)| {
            let name = k.as_str().to_ascii_lowercase();
            let value = v.to_str().unwrap_or("<invalid>");
            let shown = if v.is_sensitive()
                || name.contains("authorization")
                || name.contains("key")
                || name.contains("token")
            {
                mask_sensitive_value(value)
            } else {
                value.to_string()
            };
            format!("{name}: {shown}")
        })
        .collect();
    rendered.join(", ")
}
