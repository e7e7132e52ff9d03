//! High-level error helper utilities for user-facing error handling.
//!
//! A failed screenshot keeps its last error and the providers that were tried.
//! These helpers turn that into a structured summary with suggestions that a
//! caller can show to an instructor instead of a generic failure.

use super::types::{ErrorCategory, LlmError, ProviderAttempt};

/// Error kind for presentation (coarse-grained)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    RateLimit,
    Client,
    Server,
    Network,
    Parsing,
    Validation,
    Configuration,
    Unsupported,
    Exhausted,
    Unknown,
}

/// Structured error summary for CLI/UI consumption
#[derive(Debug, Clone)]
pub struct ErrorSummary {
    pub kind: ErrorKind,
    pub status: Option<u16>,
    pub message: String,
    /// Retry hint in seconds for rate limited calls
    pub retry_after_secs: Option<u64>,
    /// Providers tried, in order, when the error came from a fallback chain
    pub attempts: Vec<ProviderAttempt>,
    pub suggestions: Vec<String>,
    /// Optional opaque JSON details when available (e.g., provider error body)
    pub details: Option<serde_json::Value>,
}

impl Default for ErrorSummary {
    fn default() -> Self {
        Self {
            kind: ErrorKind::Unknown,
            status: None,
            message: String::new(),
            retry_after_secs: None,
            attempts: Vec::new(),
            suggestions: Vec::new(),
            details: None,
        }
    }
}

/// Summarize an LlmError with friendly suggestions.
///
/// `provider_name` is optional and only used to phrase suggestions.
pub fn summarize_error(err: &LlmError, provider_name: Option<&str>) -> ErrorSummary {
    let attempts = match err {
        LlmError::AllProvidersFailed { attempts } => attempts.clone(),
        _ => Vec::new(),
    };
    ErrorSummary {
        kind: map_error_kind(err),
        status: err.status_code(),
        message: extract_raw_message(err),
        retry_after_secs: err.retry_after().map(|d| d.as_secs()),
        attempts,
        suggestions: suggest_fixes(err, provider_name),
        details: extract_details(err),
    }
}

/// Map LlmError to presentation ErrorKind.
pub fn map_error_kind(err: &LlmError) -> ErrorKind {
    match err.category() {
        ErrorCategory::Authentication => ErrorKind::Auth,
        ErrorCategory::RateLimit => ErrorKind::RateLimit,
        ErrorCategory::Client => ErrorKind::Client,
        ErrorCategory::Server => ErrorKind::Server,
        ErrorCategory::Network => ErrorKind::Network,
        ErrorCategory::Parsing => ErrorKind::Parsing,
        ErrorCategory::Validation => ErrorKind::Validation,
        ErrorCategory::Configuration => ErrorKind::Configuration,
        ErrorCategory::Unsupported => ErrorKind::Unsupported,
        ErrorCategory::Exhausted => ErrorKind::Exhausted,
        ErrorCategory::Internal => ErrorKind::Unknown,
    }
}

fn extract_raw_message(err: &LlmError) -> String {
    match err {
        LlmError::ResponseError { message, .. }
        | LlmError::RateLimitError { message, .. }
        | LlmError::ConnectionError { message, .. } => message.clone(),
        LlmError::AuthenticationError(msg)
        | LlmError::ParseError(msg)
        | LlmError::InvalidParameter(msg)
        | LlmError::ConfigurationError(msg) => msg.clone(),
        LlmError::AllProvidersFailed { attempts } => attempts
            .last()
            .map(|a| a.error.clone())
            .unwrap_or_else(|| err.to_string()),
        _ => err.to_string(),
    }
}

/// Suggest fixes based on error type and optional provider name.
pub fn suggest_fixes(err: &LlmError, provider_name: Option<&str>) -> Vec<String> {
    let mut tips = Vec::new();
    match err.category() {
        ErrorCategory::Authentication => {
            tips.push("Verify the provider API key in the organization settings".to_string());
        }
        ErrorCategory::RateLimit => {
            tips.push("Wait for the Retry-After window or lower the upload rate".to_string());
            tips.push("Add a fallback provider to absorb rate limits".to_string());
        }
        ErrorCategory::Client => {
            tips.push("Check the selected model name and request parameters".to_string());
        }
        ErrorCategory::Server | ErrorCategory::Network => {
            tips.push("Retry later; check the provider status page".to_string());
        }
        ErrorCategory::Parsing => {
            tips.push("The provider returned an unexpected response shape".to_string());
        }
        ErrorCategory::Validation => {
            tips.push("Upload a PNG, JPEG, WebP or GIF image under the size limit".to_string());
        }
        ErrorCategory::Configuration => {
            tips.push("Configure at least one active provider for this organization".to_string());
        }
        ErrorCategory::Unsupported => {
            tips.push("Select a vision-capable provider for screenshot analysis".to_string());
        }
        ErrorCategory::Exhausted => {
            tips.push("Every configured provider failed; review each attempt below".to_string());
        }
        ErrorCategory::Internal => {}
    }
    if let Some(name) = provider_name {
        tips.push(format!(
            "Open provider settings to review {} configuration",
            name
        ));
    }
    tips
}

fn extract_details(err: &LlmError) -> Option<serde_json::Value> {
    match err {
        LlmError::ResponseError { details, .. } => details.clone(),
        _ => None,
    }
}

/// Render a CLI-friendly string for ErrorSummary.
pub fn format_summary(summary: &ErrorSummary, verbose: bool) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    if let Some(code) = summary.status {
        let _ = writeln!(out, "Status: {}", code);
    }
    let _ = writeln!(out, "Message: {}", summary.message);
    if let Some(secs) = summary.retry_after_secs {
        let _ = writeln!(out, "Retry after: {}s", secs);
    }
    if !summary.attempts.is_empty() {
        let _ = writeln!(out, "Providers tried:");
        for (i, attempt) in summary.attempts.iter().enumerate() {
            let _ = writeln!(out, "  {}. {} ({})", i + 1, attempt.provider, attempt.error);
        }
    }
    if !summary.suggestions.is_empty() {
        let _ = writeln!(out, "Suggestions:");
        for s in &summary.suggestions {
            let _ = writeln!(out, "  - {}", s);
        }
    }
    if verbose && let Some(d) = &summary.details {
        let _ = writeln!(out, "Details: {d}");
    }
    out
}
