//! Core error types

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::providers::ProviderKind;

/// Coarse error category used for retry decisions and presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Validation,
    Authentication,
    RateLimit,
    Client,
    Server,
    Network,
    Parsing,
    Configuration,
    Unsupported,
    Exhausted,
    Internal,
}

/// One failed provider attempt recorded by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderAttempt {
    pub provider: ProviderKind,
    pub error: String,
}

/// Unified error type for every adapter, the registry and the orchestrator.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// Image bytes do not match a supported format
    #[error("Unsupported image format: {mime}")]
    UnsupportedFormat { mime: String },

    /// Image exceeds the size ceiling
    #[error("Payload too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Credential rejected by the vendor (401/403)
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// Vendor rate limited the request (429)
    #[error("Rate limit error: {message}")]
    RateLimitError {
        message: String,
        retry_after: Option<Duration>,
    },

    /// Vendor returned an unexpected status
    #[error("Response error {code}: {message}")]
    ResponseError {
        code: u16,
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Network failure or timeout
    #[error("Connection error: {message}")]
    ConnectionError { message: String, timed_out: bool },

    /// No provider entry matches the selection rules for a tenant
    #[error("No provider configured for tenant '{tenant}'")]
    NoProviderConfigured { tenant: String },

    /// A vision call was routed to a provider without vision support
    #[error("Provider '{provider}' does not support vision input")]
    VisionUnsupported { provider: ProviderKind },

    /// Primary and every fallback provider failed
    #[error("All providers failed after {} attempt(s): {}", .attempts.len(), summarize_attempts(.attempts))]
    AllProvidersFailed { attempts: Vec<ProviderAttempt> },

    /// Provider needs a credential and none was supplied
    #[error("Missing API key: {0}")]
    MissingApiKey(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("JSON error: {0}")]
    JsonError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

fn summarize_attempts(attempts: &[ProviderAttempt]) -> String {
    attempts
        .iter()
        .map(|a| format!("{}: {}", a.provider, a.error))
        .collect::<Vec<_>>()
        .join("; ")
}

impl LlmError {
    /// Build a `ResponseError` without details
    pub fn response_error(code: u16, message: impl Into<String>) -> Self {
        Self::ResponseError {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Build a `ResponseError` carrying the structured vendor body
    pub fn response_error_with_details(
        code: u16,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::ResponseError {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::RateLimitError {
            message: message.into(),
            retry_after,
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
            timed_out: true,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnsupportedFormat { .. } | Self::PayloadTooLarge { .. } => {
                ErrorCategory::Validation
            }
            Self::InvalidParameter(_) => ErrorCategory::Validation,
            Self::AuthenticationError(_) | Self::MissingApiKey(_) => ErrorCategory::Authentication,
            Self::RateLimitError { .. } => ErrorCategory::RateLimit,
            Self::ResponseError { code, .. } if *code >= 500 => ErrorCategory::Server,
            Self::ResponseError { .. } => ErrorCategory::Client,
            Self::ConnectionError { .. } => ErrorCategory::Network,
            Self::ParseError(_) | Self::JsonError(_) => ErrorCategory::Parsing,
            Self::NoProviderConfigured { .. } | Self::ConfigurationError(_) => {
                ErrorCategory::Configuration
            }
            Self::VisionUnsupported { .. } => ErrorCategory::Unsupported,
            Self::AllProvidersFailed { .. } => ErrorCategory::Exhausted,
            Self::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// Whether the resilience policy may retry this error against the same provider.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimitError { .. } | Self::ConnectionError { .. } => true,
            Self::ResponseError { code, .. } => *code >= 500,
            _ => false,
        }
    }

    /// Whether the error comes from input validation and no provider could do better.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat { .. } | Self::PayloadTooLarge { .. }
        )
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ResponseError { code, .. } => Some(*code),
            Self::RateLimitError { .. } => Some(429),
            Self::PayloadTooLarge { .. } => Some(413),
            Self::UnsupportedFormat { .. } => Some(415),
            _ => None,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimitError { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_retryable_client_errors_are_not() {
        assert!(LlmError::response_error(503, "unavailable").is_retryable());
        assert!(!LlmError::response_error(404, "missing").is_retryable());
        assert!(!LlmError::AuthenticationError("bad key".into()).is_retryable());
        assert!(LlmError::timeout("slow").is_retryable());
    }

    #[test]
    fn all_providers_failed_lists_attempts() {
        let err = LlmError::AllProvidersFailed {
            attempts: vec![
                ProviderAttempt {
                    provider: ProviderKind::OpenAi,
                    error: "boom".into(),
                },
                ProviderAttempt {
                    provider: ProviderKind::Anthropic,
                    error: "down".into(),
                },
            ],
        };
        let text = err.to_string();
        assert!(text.contains("2 attempt(s)"));
        assert!(text.contains("openai: boom"));
        assert!(text.contains("anthropic: down"));
        assert_eq!(err.category(), ErrorCategory::Exhausted);
    }
}
