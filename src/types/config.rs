//! Provider, tenant and orchestrator configuration

use std::collections::HashSet;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::error::LlmError;
use crate::providers::ProviderKind;

pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_PRIORITY: u32 = 100;
pub const DEFAULT_MAX_FALLBACK_ATTEMPTS: usize = 2;
pub const DEFAULT_MAX_IMAGE_SIZE_BYTES: usize = 20 * 1024 * 1024;
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_priority() -> u32 {
    DEFAULT_PRIORITY
}

fn default_active() -> bool {
    true
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_empty()).map(SecretString::from))
}

/// One provider entry of a tenant's configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProviderConfig {
    pub provider: ProviderKind,
    /// Credential; never serialized back out
    #[serde(default, deserialize_with = "deserialize_secret", skip_serializing)]
    pub api_key: Option<SecretString>,
    /// Endpoint override
    #[validate(url)]
    #[serde(default)]
    pub base_url: Option<String>,
    /// Preferred text model
    #[serde(default)]
    pub model: Option<String>,
    /// Preferred vision model
    #[serde(default)]
    pub vision_model: Option<String>,
    /// Per-call timeout; the provider default applies when absent
    #[validate(range(min = 1, max = 600))]
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[validate(range(max = 10))]
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Lower rank is tried first
    #[serde(default = "default_priority")]
    pub priority: u32,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl ProviderConfig {
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            api_key: None,
            base_url: None,
            model: None,
            vision_model: None,
            timeout_secs: None,
            max_retries: DEFAULT_MAX_RETRIES,
            priority: DEFAULT_PRIORITY,
            active: true,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_vision_model(mut self, model: impl Into<String>) -> Self {
        self.vision_model = Some(model.into());
        self
    }

    pub const fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub const fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub const fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Exposed credential, if any
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|k| k.expose_secret())
    }

    /// Credential required by the provider, or `MissingApiKey`
    pub fn require_api_key(&self) -> Result<&str, LlmError> {
        self.api_key().filter(|k| !k.trim().is_empty()).ok_or_else(|| {
            LlmError::MissingApiKey(format!("{} requires an API key", self.provider))
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }

    pub fn text_model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Vision model, falling back to the text model, then the provider default
    pub fn vision_model(&self) -> &str {
        self.vision_model
            .as_deref()
            .or(self.model.as_deref())
            .unwrap_or_else(|| self.provider.default_vision_model())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.provider.default_timeout())
    }
}

/// Provider configuration of one tenant (organization)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OrganizationConfig {
    pub tenant_id: String,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    /// Provider used for text generation when no override is given
    #[serde(default)]
    pub default_provider: Option<ProviderKind>,
    /// Provider preferred for vision calls
    #[serde(default)]
    pub vision_provider: Option<ProviderKind>,
}

impl OrganizationConfig {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            ..Default::default()
        }
    }

    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.providers.push(provider);
        self
    }

    pub const fn with_default_provider(mut self, provider: ProviderKind) -> Self {
        self.default_provider = Some(provider);
        self
    }

    pub const fn with_vision_provider(mut self, provider: ProviderKind) -> Self {
        self.vision_provider = Some(provider);
        self
    }

    /// Validate every provider entry
    pub fn validate(&self) -> Result<(), LlmError> {
        if self.tenant_id.trim().is_empty() {
            return Err(LlmError::ConfigurationError(
                "tenant_id must not be empty".to_string(),
            ));
        }
        for provider in &self.providers {
            provider.validate()?;
        }
        Ok(())
    }

    /// Active entry for a provider kind (best priority wins on duplicates)
    pub fn active_entry(&self, kind: ProviderKind) -> Option<&ProviderConfig> {
        self.providers
            .iter()
            .filter(|p| p.active && p.provider == kind)
            .min_by_key(|p| p.priority)
    }

    /// Active entries, deduplicated by provider kind, sorted ascending by priority.
    ///
    /// Ties keep configuration order.
    pub fn fallback_order(&self) -> Vec<&ProviderConfig> {
        let mut active: Vec<&ProviderConfig> = self.providers.iter().filter(|p| p.active).collect();
        active.sort_by_key(|p| p.priority);
        let mut seen = HashSet::new();
        active.retain(|p| seen.insert(p.provider));
        active
    }
}

/// Orchestrator behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Fallback providers tried after the primary fails
    pub max_fallback_attempts: usize,
    pub max_image_size_bytes: usize,
    pub cache_capacity: usize,
    /// Coalesce concurrent analyses of identical bytes
    pub single_flight: bool,
    pub analysis_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_fallback_attempts: DEFAULT_MAX_FALLBACK_ATTEMPTS,
            max_image_size_bytes: DEFAULT_MAX_IMAGE_SIZE_BYTES,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            single_flight: true,
            analysis_prompt: crate::prompts::SCREENSHOT_ANALYSIS_PROMPT.to_string(),
            max_tokens: 4096,
            temperature: 0.2,
        }
    }
}

impl OrchestratorConfig {
    pub const fn with_max_fallback_attempts(mut self, attempts: usize) -> Self {
        self.max_fallback_attempts = attempts;
        self
    }

    pub const fn with_max_image_size_bytes(mut self, bytes: usize) -> Self {
        self.max_image_size_bytes = bytes;
        self
    }

    pub const fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub const fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    pub fn with_analysis_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.analysis_prompt = prompt.into();
        self
    }
}
