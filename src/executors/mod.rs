//! Executors Layer
//!
//! Stable HTTP orchestration that wires transformers with provider endpoints.
//! Every adapter sends its calls through `HttpExecutor`, which applies the
//! resilience policy around the network exchange.

pub mod http;

pub use http::{HttpExecutor, ProviderResponse};

use reqwest::header::HeaderMap;

use crate::error::LlmError;

/// Builds the request URL for a model
pub type UrlBuilder = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Builds request headers; fails when a credential cannot be encoded
pub type HeaderBuilder = Box<dyn Fn() -> Result<HeaderMap, LlmError> + Send + Sync>;
