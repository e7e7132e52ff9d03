//! Error Handling Module
//!
//! This module provides error handling for the orchestration layer, including:
//! - Core error types (`LlmError`, `ErrorCategory`, `ProviderAttempt`)
//! - User-facing error helpers and summaries
//! - Type conversions from common error types
//!
//! # Example
//!
//! ```rust,ignore
//! use coursegen_ai::error::{LlmError, ErrorCategory};
//!
//! let error = LlmError::response_error(404, "Not found");
//! assert_eq!(error.category(), ErrorCategory::Client);
//! assert!(!error.is_retryable());
//! ```

// Module declarations
mod conversions;
pub mod helpers;
pub mod types;

// Re-exports for public API
pub use helpers::*;
pub use types::*;
