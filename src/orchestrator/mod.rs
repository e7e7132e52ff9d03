//! Analysis orchestrator
//!
//! Drives one screenshot through validation, the content-hash cache, the
//! tenant's primary provider and its fallback chain. The orchestrator is the
//! only place that decides between escalating to another provider and
//! surfacing a terminal failure.

pub mod cache;
pub mod state;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::analysis::{CombineOptions, combine};
use crate::error::{LlmError, ProviderAttempt};
use crate::providers::ProviderKind;
use crate::registry::{ProviderRegistry, ResolvedProvider};
use crate::traits::ProviderAdapter;
use crate::types::{
    GenerationRequest, GenerationResult, ImageInput, ImageMetadata, OrchestratorConfig,
    VisionAnalysis, VisionRequest,
};
use crate::utils::inspect;
use crate::utils::mime::{describe_mime, detect_format};

pub use cache::AnalysisCache;
pub use state::{Screenshot, ScreenshotState};

/// Per-call knobs for image analysis
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    /// Prompt override; the configured analysis prompt is used when absent
    pub prompt: Option<String>,
    /// Provider override for the primary attempt
    pub provider: Option<ProviderKind>,
    /// Model override for the primary attempt only
    pub model: Option<String>,
}

impl AnalyzeOptions {
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub const fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub analysis: Arc<VisionAnalysis>,
    /// Provider that produced the analysis (the original one for cache hits)
    pub provider: ProviderKind,
    /// Providers invoked by this call, in order; empty for cache hits
    pub attempted: Vec<ProviderKind>,
    pub from_cache: bool,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub result: GenerationResult,
    pub provider: ProviderKind,
    pub attempted: Vec<ProviderKind>,
}

/// Per-item outcomes plus the merged analysis of the successes
#[derive(Debug)]
pub struct BatchOutcome {
    pub items: Vec<Result<AnalysisOutcome, LlmError>>,
    pub combined: Option<VisionAnalysis>,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }
}

/// Selection constraints shared by the primary and the fallbacks
struct Route<'a> {
    require_vision: bool,
    override_provider: Option<ProviderKind>,
    model: Option<String>,
    image: Option<&'a [u8]>,
}

impl Route<'_> {
    fn accepts(&self, candidate: &ResolvedProvider) -> bool {
        if !self.require_vision {
            return true;
        }
        let caps = candidate.adapter.capabilities();
        caps.vision && self.image.is_none_or(|bytes| caps.check_image(bytes).is_ok())
    }
}

#[derive(Debug, Default)]
struct Escalation {
    attempted: Vec<ProviderKind>,
    failures: Vec<ProviderAttempt>,
    last_error: Option<LlmError>,
}

impl Escalation {
    async fn attempt<T, F, Fut>(
        &mut self,
        candidate: &ResolvedProvider,
        model: Option<String>,
        call: &F,
    ) -> Option<T>
    where
        F: Fn(Arc<dyn ProviderAdapter>, Option<String>) -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let provider = candidate.kind();
        self.attempted.push(provider);
        match call(candidate.adapter.clone(), model).await {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(provider = %provider, error = %error, "provider attempt failed");
                self.failures.push(ProviderAttempt {
                    provider,
                    error: error.to_string(),
                });
                self.last_error = Some(error);
                None
            }
        }
    }
}

pub struct AnalysisOrchestrator {
    registry: Arc<ProviderRegistry>,
    config: OrchestratorConfig,
    cache: AnalysisCache,
}

impl std::fmt::Debug for AnalysisOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisOrchestrator")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish()
    }
}

impl AnalysisOrchestrator {
    pub fn new(registry: Arc<ProviderRegistry>, config: OrchestratorConfig) -> Self {
        let cache = AnalysisCache::new(config.cache_capacity);
        Self {
            registry,
            config,
            cache,
        }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Forget the cached analysis for one content hash
    pub fn invalidate(&self, content_hash: &str) -> bool {
        self.cache.invalidate(content_hash)
    }

    /// Reject unknown or oversize images, then compute their metadata
    pub fn validate(&self, bytes: &[u8]) -> Result<ImageMetadata, LlmError> {
        if !detect_format(bytes).is_known() {
            return Err(LlmError::UnsupportedFormat {
                mime: describe_mime(bytes),
            });
        }
        let limit = self.config.max_image_size_bytes;
        if bytes.len() > limit {
            return Err(LlmError::PayloadTooLarge {
                size: bytes.len(),
                limit,
            });
        }
        Ok(inspect(bytes))
    }

    /// Analyze a single image for a tenant
    pub async fn analyze(
        &self,
        tenant_id: &str,
        image: impl Into<ImageInput>,
        options: &AnalyzeOptions,
    ) -> Result<AnalysisOutcome, LlmError> {
        let mut screenshot = Screenshot::new(tenant_id, image);
        self.process(&mut screenshot, options).await
    }

    /// Run a pending screenshot to `Analyzed` or `Failed`.
    ///
    /// On failure the screenshot keeps the last provider error and the
    /// ordered list of providers attempted.
    pub async fn process(
        &self,
        screenshot: &mut Screenshot,
        options: &AnalyzeOptions,
    ) -> Result<AnalysisOutcome, LlmError> {
        if screenshot.state() != ScreenshotState::Pending {
            return Err(LlmError::InvalidParameter(format!(
                "screenshot {} was already processed (state {})",
                screenshot.id,
                screenshot.state()
            )));
        }
        let started = Instant::now();
        screenshot.transition(ScreenshotState::Validating)?;

        let validated = screenshot
            .image
            .to_bytes()
            .and_then(|bytes| self.validate(&bytes).map(|meta| (bytes, meta)));
        let (bytes, metadata) = match validated {
            Ok(v) => v,
            Err(error) => {
                debug!(tenant = %screenshot.tenant_id, error = %error, "screenshot rejected");
                screenshot.fail(error.clone());
                return Err(error);
            }
        };
        let hash = metadata.content_hash.clone();
        screenshot.metadata = Some(metadata);

        if let Some(hit) = self.cache.get(&hash) {
            return self.finish_cached(screenshot, hit, &hash, started);
        }

        let flight = self.config.single_flight.then(|| self.cache.lock_for(&hash));
        let _guard = match &flight {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };
        if flight.is_some()
            && let Some(hit) = self.cache.get(&hash)
        {
            return self.finish_cached(screenshot, hit, &hash, started);
        }

        screenshot.transition(ScreenshotState::Analyzing)?;
        let prompt = options
            .prompt
            .clone()
            .unwrap_or_else(|| self.config.analysis_prompt.clone());
        let request = VisionRequest::new(bytes.clone(), prompt)
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature);
        let route = Route {
            require_vision: true,
            override_provider: options.provider,
            model: options.model.clone(),
            image: Some(&bytes),
        };
        let tenant = screenshot.tenant_id.clone();

        let (result, escalation) = self
            .run_with_fallback(&tenant, &route, |adapter, model| {
                let mut request = request.clone();
                request.model = model;
                async move { adapter.analyze_image(request).await }
            })
            .await;

        screenshot.attempted_providers = escalation.attempted.clone();
        match result {
            Ok((analysis, provider)) => {
                let analysis = Arc::new(analysis);
                self.cache.insert(hash.clone(), analysis.clone());
                screenshot.analysis = Some(analysis.clone());
                screenshot.transition(ScreenshotState::Analyzed)?;
                let processing_time_ms = started.elapsed().as_millis() as u64;
                info!(
                    tenant = %tenant,
                    provider = %provider,
                    content_hash = %hash,
                    attempts = escalation.attempted.len(),
                    latency_ms = processing_time_ms,
                    "screenshot analyzed"
                );
                Ok(AnalysisOutcome {
                    analysis,
                    provider,
                    attempted: escalation.attempted,
                    from_cache: false,
                    processing_time_ms,
                })
            }
            Err(error) => {
                screenshot.fail(escalation.last_error.unwrap_or_else(|| error.clone()));
                Err(error)
            }
        }
    }

    fn finish_cached(
        &self,
        screenshot: &mut Screenshot,
        hit: Arc<VisionAnalysis>,
        content_hash: &str,
        started: Instant,
    ) -> Result<AnalysisOutcome, LlmError> {
        screenshot.transition(ScreenshotState::Cached)?;
        screenshot.from_cache = true;
        screenshot.analysis = Some(hit.clone());
        screenshot.transition(ScreenshotState::Analyzed)?;
        debug!(tenant = %screenshot.tenant_id, content_hash = %content_hash, "analysis cache hit");
        Ok(AnalysisOutcome {
            provider: hit.generation.provider,
            analysis: hit,
            attempted: Vec::new(),
            from_cache: true,
            processing_time_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Analyze every screenshot concurrently, then merge the successes.
    ///
    /// A failing item never cancels its siblings; its error is kept in
    /// `items` and on the screenshot itself.
    pub async fn analyze_batch(
        &self,
        screenshots: &mut [Screenshot],
        options: &AnalyzeOptions,
        combine_options: &CombineOptions,
    ) -> BatchOutcome {
        let items = join_all(
            screenshots
                .iter_mut()
                .map(|screenshot| self.process(screenshot, options)),
        )
        .await;

        let analyses: Vec<VisionAnalysis> = items
            .iter()
            .filter_map(|item| item.as_ref().ok())
            .map(|outcome| outcome.analysis.as_ref().clone())
            .collect();
        let combined = combine(&analyses, combine_options);
        debug!(
            total = items.len(),
            succeeded = analyses.len(),
            "batch analysis finished"
        );
        BatchOutcome { items, combined }
    }

    /// Text generation with the same primary and fallback policy. Not cached.
    pub async fn generate_text(
        &self,
        tenant_id: &str,
        request: GenerationRequest,
        override_provider: Option<ProviderKind>,
    ) -> Result<GenerationOutcome, LlmError> {
        let bytes = request
            .image
            .as_ref()
            .map(ImageInput::to_bytes)
            .transpose()?;
        let route = Route {
            require_vision: bytes.is_some(),
            override_provider,
            model: request.model.clone(),
            image: bytes.as_deref(),
        };

        let (result, escalation) = self
            .run_with_fallback(tenant_id, &route, |adapter, model| {
                let mut request = request.clone();
                request.model = model;
                async move { adapter.generate_text(request).await }
            })
            .await;
        let (result, provider) = result?;
        Ok(GenerationOutcome {
            result,
            provider,
            attempted: escalation.attempted,
        })
    }

    /// Primary attempt, then up to `max_fallback_attempts` eligible fallbacks.
    ///
    /// Selection errors for the primary fail fast without escalation.
    async fn run_with_fallback<T, F, Fut>(
        &self,
        tenant_id: &str,
        route: &Route<'_>,
        call: F,
    ) -> (Result<(T, ProviderKind), LlmError>, Escalation)
    where
        F: Fn(Arc<dyn ProviderAdapter>, Option<String>) -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let mut escalation = Escalation::default();
        let primary =
            match self
                .registry
                .resolve(tenant_id, route.require_vision, route.override_provider)
            {
                Ok(primary) => primary,
                Err(error) => return (Err(error), escalation),
            };

        if let Some(value) = escalation
            .attempt(&primary, route.model.clone(), &call)
            .await
        {
            return (Ok((value, primary.kind())), escalation);
        }

        let exclude: HashSet<ProviderKind> = escalation.attempted.iter().copied().collect();
        let chain = self.registry.fallback_chain(tenant_id, &exclude);
        for candidate in chain
            .into_iter()
            .filter(|candidate| route.accepts(candidate))
            .take(self.config.max_fallback_attempts)
        {
            warn!(
                tenant = %tenant_id,
                provider = %candidate.kind(),
                attempt = escalation.attempted.len() + 1,
                "escalating to fallback provider"
            );
            if let Some(value) = escalation.attempt(&candidate, None, &call).await {
                return (Ok((value, candidate.kind())), escalation);
            }
        }

        let error = LlmError::AllProvidersFailed {
            attempts: escalation.failures.clone(),
        };
        (Err(error), escalation)
    }
}
