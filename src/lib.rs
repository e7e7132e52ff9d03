//! # coursegen-ai - Multi-Provider Generation Orchestration
//!
//! Turns course screenshots into structured course material through eight
//! interchangeable LLM vendors behind one adapter contract.
//!
//! ## Features
//!
//! - **One Adapter Contract**: OpenAI, Anthropic, Gemini, Mistral, DeepSeek, Qwen,
//!   OpenRouter and Ollama all implement `ProviderAdapter`.
//! - **Shared Resilience Policy**: retry, backoff and Retry-After handling written once.
//! - **Per-Tenant Registry**: provider selection, priorities and fallback chains per organization.
//! - **Content-Hash Cache**: identical screenshots are analyzed once.
//! - **Batch Combiner**: many screenshots fold into one course outline.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use coursegen_ai::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Arc::new(ProviderRegistry::default());
//!     registry.set_organization_config(
//!         OrganizationConfig::new("acme")
//!             .with_provider(ProviderConfig::new(ProviderKind::OpenAi).with_api_key("sk-...").with_priority(1))
//!             .with_provider(ProviderConfig::new(ProviderKind::Anthropic).with_api_key("sk-ant-...").with_priority(2)),
//!     )?;
//!
//!     let orchestrator = AnalysisOrchestrator::new(registry, OrchestratorConfig::default());
//!     let bytes = std::fs::read("slide.png")?;
//!     let outcome = orchestrator.analyze("acme", bytes, &AnalyzeOptions::default()).await?;
//!     println!("{} via {}", outcome.analysis.extracted_text, outcome.provider);
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]

pub mod analysis;
pub mod error;
pub mod executors;
pub mod observability;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod registry;
pub mod retry;
pub mod traits;
pub mod transformers;
pub mod types;
pub mod utils;

pub use error::LlmError;
pub use orchestrator::AnalysisOrchestrator;
pub use providers::ProviderKind;
pub use registry::ProviderRegistry;

pub mod prelude {
    pub use crate::analysis::{CombineOptions, combine};
    pub use crate::error::{ErrorCategory, LlmError, ProviderAttempt};
    pub use crate::observability::{OutputFormat, TracingConfig, init_tracing};
    pub use crate::orchestrator::{
        AnalysisOrchestrator, AnalysisOutcome, AnalyzeOptions, BatchOutcome, GenerationOutcome,
        Screenshot, ScreenshotState,
    };
    pub use crate::providers::{ProviderClient, ProviderKind};
    pub use crate::registry::{AdapterFactory, HttpAdapterFactory, ProviderRegistry};
    pub use crate::retry::ResiliencePolicy;
    pub use crate::traits::{ProviderAdapter, ProviderCapabilities};
    pub use crate::types::{
        CourseOutline, Difficulty, FinishReason, GenerationRequest, GenerationResult, ImageFormat,
        ImageInput, OrchestratorConfig, OrganizationConfig, ProviderConfig, Usage,
        VisionAnalysis, VisionRequest,
    };
}

static_assertions::assert_impl_all!(AnalysisOrchestrator: Send, Sync);
static_assertions::assert_impl_all!(ProviderRegistry: Send, Sync);
static_assertions::assert_impl_all!(providers::ProviderClient: Send, Sync);
static_assertions::assert_impl_all!(LlmError: Send, Sync, Clone);
