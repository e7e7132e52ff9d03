//! Adapter construction
//!
//! The registry never builds adapters directly; it asks an `AdapterFactory`,
//! so tests and embedders can substitute their own adapters.

use std::sync::Arc;

use validator::Validate;

use crate::error::LlmError;
use crate::providers::build_client;
use crate::retry::ResiliencePolicy;
use crate::traits::ProviderAdapter;
use crate::types::ProviderConfig;

/// Builds an adapter for one provider configuration entry
pub trait AdapterFactory: Send + Sync {
    fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn ProviderAdapter>, LlmError>;
}

impl<F> AdapterFactory for F
where
    F: Fn(&ProviderConfig) -> Result<Arc<dyn ProviderAdapter>, LlmError> + Send + Sync,
{
    fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn ProviderAdapter>, LlmError> {
        self(config)
    }
}

/// Factory for the HTTP adapters of the eight supported vendors
#[derive(Debug, Clone, Default)]
pub struct HttpAdapterFactory {
    /// Template policy; each entry's `max_retries` overrides the retry budget
    pub policy: ResiliencePolicy,
}

impl HttpAdapterFactory {
    pub fn new(policy: ResiliencePolicy) -> Self {
        Self { policy }
    }
}

impl AdapterFactory for HttpAdapterFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn ProviderAdapter>, LlmError> {
        config.validate()?;
        let client = build_client(config, self.policy.clone())?;
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderKind;

    #[test]
    fn builds_each_vendor_with_credentials() {
        let factory = HttpAdapterFactory::default();
        for kind in ProviderKind::ALL {
            let config = ProviderConfig::new(kind).with_api_key("test-key");
            let adapter = factory.create(&config).unwrap();
            assert_eq!(adapter.provider_kind(), kind);
            assert_eq!(adapter.capabilities(), kind.capabilities());
        }
    }

    #[test]
    fn missing_credential_and_invalid_config_fail() {
        let factory = HttpAdapterFactory::default();
        assert!(matches!(
            factory.create(&ProviderConfig::new(ProviderKind::OpenAi)),
            Err(LlmError::MissingApiKey(_))
        ));
        // Local runtime needs no key
        assert!(factory.create(&ProviderConfig::new(ProviderKind::Ollama)).is_ok());

        let bad = ProviderConfig::new(ProviderKind::Ollama).with_timeout_secs(0);
        assert!(matches!(
            factory.create(&bad),
            Err(LlmError::ConfigurationError(_))
        ));
    }
}
