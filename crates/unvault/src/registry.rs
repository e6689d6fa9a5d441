//! Secret provider registry
//!
//! Maps provider type names from configuration to constructors, so consumers
//! can install their own provider types next to the built-in ones.

use crate::error::ProviderError;
use crate::providers::{EnvProvider, ExecProvider, FileProvider, SecretProvider};
use crate::ProviderConfig;
use std::collections::HashMap;
use std::sync::Arc;

/// Constructor for a provider type.
pub type ProviderFactory =
    Arc<dyn Fn(&ProviderConfig) -> Result<Arc<dyn SecretProvider>, ProviderError> + Send + Sync>;

/// Registry of provider constructors, keyed by the configuration `type` name.
///
/// # Example
///
/// ```ignore
/// use unvault::{ProviderConfig, ProviderRegistry};
///
/// let registry = ProviderRegistry::with_builtins();
/// let provider = registry.build(&ProviderConfig::new("env").with_param("var", "VAULT_PASSWORD"))?;
/// let identities = provider.load_identities().await?;
/// ```
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry with the built-in `env`, `file` and `exec` providers
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("env", |config| {
            Ok(Arc::new(EnvProvider::from_config(config)?) as Arc<dyn SecretProvider>)
        });
        registry.register("file", |config| {
            Ok(Arc::new(FileProvider::from_config(config)?) as Arc<dyn SecretProvider>)
        });
        registry.register("exec", |config| {
            Ok(Arc::new(ExecProvider::from_config(config)?) as Arc<dyn SecretProvider>)
        });
        registry
    }

    /// Register a constructor for a provider type
    ///
    /// If a constructor with the same name already exists, it is replaced.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&ProviderConfig) -> Result<Arc<dyn SecretProvider>, ProviderError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(kind.into(), Arc::new(factory));
    }

    /// Check if a constructor is registered for the given type
    #[must_use]
    pub fn has(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered provider type names, sorted
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Construct the provider described by one configuration entry
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidConfig`] if the type is not registered,
    /// or whatever the provider's constructor rejects.
    pub fn build(&self, config: &ProviderConfig) -> Result<Arc<dyn SecretProvider>, ProviderError> {
        let factory = self.factories.get(&config.kind).ok_or_else(|| {
            ProviderError::invalid_config(
                &config.kind,
                format!(
                    "unknown provider type (available: {})",
                    self.kinds().join(", ")
                ),
            )
        })?;
        factory(config)
    }

    /// Construct every configured provider, preserving order
    ///
    /// # Errors
    ///
    /// Fails on the first entry that cannot be constructed.
    pub fn build_all(
        &self,
        configs: &[ProviderConfig],
    ) -> Result<Vec<Arc<dyn SecretProvider>>, ProviderError> {
        configs.iter().map(|config| self.build(config)).collect()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::SecretIdentity;
    use async_trait::async_trait;

    struct FixedProvider;

    #[async_trait]
    impl SecretProvider for FixedProvider {
        fn provider_name(&self) -> &'static str {
            "fixed"
        }

        async fn load_identities(&self) -> Result<Vec<SecretIdentity>, ProviderError> {
            Ok(vec![SecretIdentity::new("fixed", "pw")])
        }
    }

    #[test]
    fn test_registry_new() {
        let registry = ProviderRegistry::new();
        assert!(registry.kinds().is_empty());
    }

    #[test]
    fn test_registry_builtins() {
        let registry = ProviderRegistry::with_builtins();
        assert_eq!(registry.kinds(), vec!["env", "exec", "file"]);
        assert!(registry.has("env"));
        assert!(!registry.has("vault"));
    }

    #[test]
    fn test_registry_build_builtin() {
        let registry = ProviderRegistry::with_builtins();
        let provider = registry
            .build(&ProviderConfig::new("file").with_param("path", "/etc/vault-pass"))
            .unwrap();
        assert_eq!(provider.provider_name(), "file");
    }

    #[test]
    fn test_registry_unknown_type() {
        let registry = ProviderRegistry::with_builtins();
        let err = registry.build(&ProviderConfig::new("keyring")).err().unwrap();

        assert!(matches!(err, ProviderError::InvalidConfig { .. }));
        assert!(err.to_string().contains("keyring"));
        assert!(err.to_string().contains("env, exec, file"));
    }

    #[test]
    fn test_registry_replace() {
        let mut registry = ProviderRegistry::new();
        registry.register("env", |_| Ok(Arc::new(FixedProvider) as Arc<dyn SecretProvider>));
        registry.register("env", |_| Ok(Arc::new(FixedProvider) as Arc<dyn SecretProvider>));

        assert_eq!(registry.kinds().len(), 1);
    }

    #[tokio::test]
    async fn test_registry_custom_provider() {
        let mut registry = ProviderRegistry::with_builtins();
        registry.register("fixed", |_| Ok(Arc::new(FixedProvider) as Arc<dyn SecretProvider>));

        let providers = registry
            .build_all(&[
                ProviderConfig::new("fixed"),
                ProviderConfig::new("env").with_param("var", "X"),
            ])
            .unwrap();
        assert_eq!(providers.len(), 2);

        let identities = providers[0].load_identities().await.unwrap();
        assert_eq!(identities[0].id(), "fixed");
    }

    #[test]
    fn test_build_all_stops_at_first_error() {
        let registry = ProviderRegistry::with_builtins();
        let result = registry.build_all(&[
            ProviderConfig::new("env"),
            ProviderConfig::new("nope"),
        ]);
        assert!(result.err().unwrap().to_string().contains("missing parameter 'var'"));
    }

    #[test]
    fn test_registry_debug() {
        let debug = format!("{:?}", ProviderRegistry::with_builtins());
        assert!(debug.contains("ProviderRegistry"));
        assert!(debug.contains("exec"));
    }
}
