//! Provider registry and selector
//!
//! Holds per-tenant provider configuration and turns it into adapters:
//! primary selection (`resolve`) and ordered fallback chains
//! (`fallback_chain`). Configuration updates replace a tenant's whole
//! `OrganizationConfig`, so a reader mid-resolution always sees one
//! consistent snapshot.

pub mod detect;
pub mod factory;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::providers::ProviderKind;
use crate::retry::ResiliencePolicy;
use crate::traits::ProviderAdapter;
use crate::types::{OrganizationConfig, ProviderConfig};

pub use detect::{detect_from_credential_shape, detect_from_endpoint};
pub use factory::{AdapterFactory, HttpAdapterFactory};

/// Environment lookup used for credential fallback
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Adapter chosen for a call, with the configuration entry it was built from
#[derive(Clone)]
pub struct ResolvedProvider {
    pub config: ProviderConfig,
    pub adapter: Arc<dyn ProviderAdapter>,
}

impl ResolvedProvider {
    pub fn kind(&self) -> ProviderKind {
        self.config.provider
    }
}

impl std::fmt::Debug for ResolvedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedProvider")
            .field("provider", &self.config.provider)
            .field("priority", &self.config.priority)
            .finish()
    }
}

pub struct ProviderRegistry {
    tenants: RwLock<HashMap<String, Arc<OrganizationConfig>>>,
    factory: Arc<dyn AdapterFactory>,
    env: Option<EnvLookup>,
    fallback_endpoint: Option<String>,
    fallback_credential: Option<SecretString>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("tenants", &self.list_tenants())
            .field("env_fallback", &self.env.is_some())
            .field("fallback_endpoint", &self.fallback_endpoint)
            .finish()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new(Arc::new(HttpAdapterFactory::default()))
    }
}

impl ProviderRegistry {
    pub fn new(factory: Arc<dyn AdapterFactory>) -> Self {
        Self {
            tenants: RwLock::new(HashMap::new()),
            factory,
            env: None,
            fallback_endpoint: None,
            fallback_credential: None,
        }
    }

    /// HTTP adapters sharing one resilience policy template
    pub fn with_policy(policy: ResiliencePolicy) -> Self {
        Self::new(Arc::new(HttpAdapterFactory::new(policy)))
    }

    /// Fall back to credentials found through `lookup` for unconfigured tenants
    pub fn with_env_lookup(mut self, lookup: EnvLookup) -> Self {
        self.env = Some(lookup);
        self
    }

    /// Fall back to the process environment for unconfigured tenants
    pub fn with_process_env(self) -> Self {
        self.with_env_lookup(Arc::new(|name: &str| std::env::var(name).ok()))
    }

    /// Last-resort endpoint and credential, identified by auto-detection
    pub fn with_fallback_credentials(
        mut self,
        endpoint: Option<String>,
        api_key: Option<String>,
    ) -> Self {
        self.fallback_endpoint = endpoint.filter(|e| !e.trim().is_empty());
        self.fallback_credential = api_key
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from);
        self
    }

    fn read_tenants(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Arc<OrganizationConfig>>>, LlmError>
    {
        self.tenants
            .read()
            .map_err(|_| LlmError::InternalError("registry lock poisoned".to_string()))
    }

    fn write_tenants(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<OrganizationConfig>>>, LlmError>
    {
        self.tenants
            .write()
            .map_err(|_| LlmError::InternalError("registry lock poisoned".to_string()))
    }

    /// Replace a tenant's configuration
    pub fn set_organization_config(&self, config: OrganizationConfig) -> Result<(), LlmError> {
        config.validate()?;
        let tenant = config.tenant_id.clone();
        let providers = config.providers.len();
        self.write_tenants()?.insert(tenant.clone(), Arc::new(config));
        debug!(tenant = %tenant, providers, "organization config updated");
        Ok(())
    }

    pub fn get_organization_config(&self, tenant_id: &str) -> Option<Arc<OrganizationConfig>> {
        self.read_tenants().ok()?.get(tenant_id).cloned()
    }

    pub fn remove_organization_config(&self, tenant_id: &str) -> Option<Arc<OrganizationConfig>> {
        self.write_tenants().ok()?.remove(tenant_id)
    }

    /// Configured tenants, sorted
    pub fn list_tenants(&self) -> Vec<String> {
        let mut tenants: Vec<String> = self
            .read_tenants()
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default();
        tenants.sort();
        tenants
    }

    /// Vendors this registry can build adapters for
    pub fn available_providers(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL.to_vec()
    }

    /// Configuration synthesized from the environment and fallback credentials
    pub fn environment_config(&self, tenant_id: &str) -> Option<OrganizationConfig> {
        let mut config = OrganizationConfig::new(tenant_id);

        if let Some(entry) = self.detected_fallback_entry() {
            config = config.with_provider(entry.with_priority(0));
        }

        if let Some(lookup) = &self.env {
            for (rank, kind) in ProviderKind::ALL.into_iter().enumerate() {
                let value = kind
                    .env_vars()
                    .iter()
                    .filter_map(|name| lookup(name))
                    .find(|v| !v.trim().is_empty());
                let Some(value) = value else { continue };
                let entry = if kind.is_local() {
                    ProviderConfig::new(kind).with_base_url(value)
                } else {
                    ProviderConfig::new(kind).with_api_key(value)
                };
                config = config.with_provider(entry.with_priority(10 * (rank as u32 + 1)));
            }
        }

        (!config.providers.is_empty()).then_some(config)
    }

    fn detected_fallback_entry(&self) -> Option<ProviderConfig> {
        let endpoint = self.fallback_endpoint.as_deref();
        let key = self.fallback_credential.as_ref().map(|k| k.expose_secret());
        let kind = endpoint
            .and_then(detect_from_endpoint)
            .or_else(|| key.and_then(detect_from_credential_shape))?;
        let mut entry = ProviderConfig::new(kind);
        if let Some(endpoint) = endpoint {
            entry = entry.with_base_url(endpoint);
        }
        if let Some(key) = key {
            entry = entry.with_api_key(key);
        }
        Some(entry)
    }

    /// Consistent configuration snapshot for one call
    pub fn snapshot(&self, tenant_id: &str) -> Result<Arc<OrganizationConfig>, LlmError> {
        if let Some(config) = self.get_organization_config(tenant_id) {
            return Ok(config);
        }
        self.environment_config(tenant_id)
            .map(Arc::new)
            .ok_or_else(|| LlmError::NoProviderConfigured {
                tenant: tenant_id.to_string(),
            })
    }

    /// Primary adapter for a call.
    ///
    /// Selection order: explicit override, the tenant's vision provider (when
    /// vision is required), the tenant's default provider, then the
    /// highest-priority active entry.
    pub fn resolve(
        &self,
        tenant_id: &str,
        require_vision: bool,
        override_provider: Option<ProviderKind>,
    ) -> Result<ResolvedProvider, LlmError> {
        let org = self.snapshot(tenant_id)?;
        let no_provider = || LlmError::NoProviderConfigured {
            tenant: tenant_id.to_string(),
        };

        let entry = match override_provider {
            Some(kind) => org.active_entry(kind).ok_or_else(no_provider)?,
            None => {
                let vision = require_vision
                    .then_some(org.vision_provider)
                    .flatten()
                    .and_then(|k| org.active_entry(k));
                vision
                    .or_else(|| org.default_provider.and_then(|k| org.active_entry(k)))
                    .or_else(|| org.fallback_order().into_iter().next())
                    .ok_or_else(no_provider)?
            }
        };

        if require_vision && !entry.provider.capabilities().vision {
            return Err(LlmError::VisionUnsupported {
                provider: entry.provider,
            });
        }
        let adapter = self.factory.create(entry)?;
        if require_vision && !adapter.capabilities().vision {
            return Err(LlmError::VisionUnsupported {
                provider: entry.provider,
            });
        }
        debug!(tenant = %tenant_id, provider = %entry.provider, require_vision, "provider resolved");
        Ok(ResolvedProvider {
            config: entry.clone(),
            adapter,
        })
    }

    /// Remaining active providers in priority order, skipping `exclude`.
    ///
    /// Entries whose adapter cannot be built are logged and skipped.
    pub fn fallback_chain(
        &self,
        tenant_id: &str,
        exclude: &HashSet<ProviderKind>,
    ) -> Vec<ResolvedProvider> {
        let org = match self.snapshot(tenant_id) {
            Ok(org) => org,
            Err(_) => return Vec::new(),
        };
        org.fallback_order()
            .into_iter()
            .filter(|entry| !exclude.contains(&entry.provider))
            .filter_map(|entry| match self.factory.create(entry) {
                Ok(adapter) => Some(ResolvedProvider {
                    config: entry.clone(),
                    adapter,
                }),
                Err(e) => {
                    warn!(
                        tenant = %tenant_id,
                        provider = %entry.provider,
                        error = %e,
                        "skipping fallback provider"
                    );
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ProviderRegistry {
        ProviderRegistry::default()
    }

    fn org() -> OrganizationConfig {
        OrganizationConfig::new("acme")
            .with_provider(
                ProviderConfig::new(ProviderKind::DeepSeek)
                    .with_api_key("sk-deepseek")
                    .with_priority(1),
            )
            .with_provider(
                ProviderConfig::new(ProviderKind::Gemini)
                    .with_api_key("AIza-test")
                    .with_priority(2),
            )
            .with_provider(
                ProviderConfig::new(ProviderKind::Anthropic)
                    .with_api_key("sk-ant-test")
                    .with_priority(3),
            )
    }

    #[test]
    fn unknown_tenant_without_fallback_fails() {
        let err = registry().resolve("nobody", false, None).unwrap_err();
        assert!(matches!(err, LlmError::NoProviderConfigured { tenant } if tenant == "nobody"));
    }

    #[test]
    fn selection_order() {
        let registry = registry();
        registry
            .set_organization_config(
                org()
                    .with_default_provider(ProviderKind::Anthropic)
                    .with_vision_provider(ProviderKind::Gemini),
            )
            .unwrap();

        let pick = |vision, over| registry.resolve("acme", vision, over).unwrap().kind();
        assert_eq!(pick(false, Some(ProviderKind::Gemini)), ProviderKind::Gemini);
        assert_eq!(pick(true, None), ProviderKind::Gemini);
        assert_eq!(pick(false, None), ProviderKind::Anthropic);

        registry.set_organization_config(org()).unwrap();
        assert_eq!(pick(false, None), ProviderKind::DeepSeek);
    }

    #[test]
    fn vision_required_on_text_only_provider() {
        let registry = registry();
        registry.set_organization_config(org()).unwrap();
        let err = registry.resolve("acme", true, None).unwrap_err();
        assert!(matches!(
            err,
            LlmError::VisionUnsupported {
                provider: ProviderKind::DeepSeek
            }
        ));
    }

    #[test]
    fn override_must_be_configured() {
        let registry = registry();
        registry.set_organization_config(org()).unwrap();
        assert!(matches!(
            registry.resolve("acme", false, Some(ProviderKind::Mistral)),
            Err(LlmError::NoProviderConfigured { .. })
        ));
    }

    #[test]
    fn fallback_chain_excludes_and_skips_broken_entries() {
        let registry = registry();
        registry
            .set_organization_config(
                org().with_provider(ProviderConfig::new(ProviderKind::OpenAi).with_priority(0)),
            )
            .unwrap();
        let exclude = HashSet::from([ProviderKind::DeepSeek]);
        let chain: Vec<ProviderKind> = registry
            .fallback_chain("acme", &exclude)
            .iter()
            .map(ResolvedProvider::kind)
            .collect();
        // OpenAI has no key and is skipped
        assert_eq!(chain, vec![ProviderKind::Gemini, ProviderKind::Anthropic]);
        assert!(registry.fallback_chain("nobody", &HashSet::new()).is_empty());
    }

    #[test]
    fn configuration_updates_replace_whole_snapshot() {
        let registry = registry();
        registry.set_organization_config(org()).unwrap();
        let before = registry.snapshot("acme").unwrap();
        registry
            .set_organization_config(OrganizationConfig::new("acme").with_provider(
                ProviderConfig::new(ProviderKind::Ollama),
            ))
            .unwrap();
        assert_eq!(before.providers.len(), 3);
        assert_eq!(registry.snapshot("acme").unwrap().providers.len(), 1);
        assert_eq!(registry.list_tenants(), vec!["acme"]);
        assert!(registry.remove_organization_config("acme").is_some());
        assert!(registry.list_tenants().is_empty());
    }

    #[test]
    fn environment_fallback() {
        let registry = registry().with_env_lookup(Arc::new(|name: &str| match name {
            "GOOGLE_API_KEY" => Some("AIza-env".to_string()),
            "OLLAMA_BASE_URL" => Some("http://gpu-box:11434".to_string()),
            "OPENAI_API_KEY" => Some(String::new()),
            _ => None,
        }));
        let config = registry.environment_config("t").unwrap();
        let kinds: Vec<ProviderKind> = config.providers.iter().map(|p| p.provider).collect();
        assert_eq!(kinds, vec![ProviderKind::Gemini, ProviderKind::Ollama]);
        assert_eq!(config.providers[1].base_url(), "http://gpu-box:11434");
        assert_eq!(registry.resolve("t", true, None).unwrap().kind(), ProviderKind::Gemini);
    }

    #[test]
    fn detected_fallback_credentials_take_precedence() {
        let registry = registry()
            .with_fallback_credentials(None, Some("sk-ant-api03-xyz".to_string()))
            .with_env_lookup(Arc::new(|name: &str| {
                (name == "OPENAI_API_KEY").then(|| "sk-proj-env".to_string())
            }));
        assert_eq!(
            registry.resolve("t", false, None).unwrap().kind(),
            ProviderKind::Anthropic
        );
        let registry = ProviderRegistry::default()
            .with_fallback_credentials(Some("http://localhost:11434".to_string()), None);
        assert_eq!(
            registry.resolve("t", true, None).unwrap().kind(),
            ProviderKind::Ollama
        );
    }
}
