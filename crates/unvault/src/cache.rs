//! Lazily-initialized, shared decryption context
//!
//! The context is built on first use and then shared by every caller. A
//! failed construction is remembered: later callers receive the same error
//! without the providers being consulted again.

use crate::config::{IdentityMatch, RevealConfig};
use crate::context::VaultContext;
use crate::error::{CacheError, ProviderError};
use crate::providers::SecretProvider;
use crate::registry::ProviderRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

type ContextSlot = OnceCell<Result<Arc<VaultContext>, CacheError>>;

/// Observable state of a [`ContextCache`].
#[derive(Debug, Clone)]
pub enum CacheState {
    /// No caller has requested the context yet, or construction is running
    Uninitialized,
    /// Construction succeeded
    Ready(Arc<VaultContext>),
    /// Construction failed; the error is permanent for this cache
    Failed(CacheError),
}

/// Holds at most one [`VaultContext`] for the lifetime of the cache.
///
/// Concurrent first callers wait on a single construction; the providers are
/// invoked at most once per cache instance. Tests and embedders that need a
/// fresh context create a new cache.
pub struct ContextCache {
    providers: Vec<Arc<dyn SecretProvider>>,
    identity_match: IdentityMatch,
    timeout: Duration,
    slot: ContextSlot,
}

impl ContextCache {
    /// Create a cache over the given providers, in precedence order
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn SecretProvider>>) -> Self {
        let defaults = RevealConfig::default();
        Self {
            providers,
            identity_match: defaults.identity_match,
            timeout: defaults.timeout(),
            slot: OnceCell::new(),
        }
    }

    /// Create a cache from configuration.
    ///
    /// Provider entries the registry cannot construct do not fail here: the
    /// cache starts out failed and reports the error on first use, exactly
    /// like a provider that fails while loading.
    #[must_use]
    pub fn from_config(config: &RevealConfig, registry: &ProviderRegistry) -> Self {
        let cache = match registry.build_all(&config.providers) {
            Ok(providers) => Self::new(providers),
            Err(err) => {
                let err = CacheError::from(err);
                tracing::error!(error = %err, "Invalid vault provider configuration");
                Self {
                    slot: OnceCell::new_with(Some(Err(err))),
                    ..Self::new(Vec::new())
                }
            }
        };
        cache
            .with_timeout(config.timeout())
            .with_identity_match(config.identity_match)
    }

    /// Bound the time context construction may take
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set how identity hints restrict candidate identities
    #[must_use]
    pub const fn with_identity_match(mut self, identity_match: IdentityMatch) -> Self {
        self.identity_match = identity_match;
        self
    }

    /// Return the shared context, constructing it on first call.
    ///
    /// # Errors
    ///
    /// Returns the construction error, which is the same on every call once
    /// construction has failed.
    pub async fn get_context(&self) -> Result<Arc<VaultContext>, CacheError> {
        self.slot.get_or_init(|| self.initialize()).await.clone()
    }

    /// Current state, without triggering construction
    #[must_use]
    pub fn state(&self) -> CacheState {
        match self.slot.get() {
            None => CacheState::Uninitialized,
            Some(Ok(context)) => CacheState::Ready(Arc::clone(context)),
            Some(Err(err)) => CacheState::Failed(err.clone()),
        }
    }

    async fn initialize(&self) -> Result<Arc<VaultContext>, CacheError> {
        tracing::debug!(
            providers = self.providers.len(),
            timeout = ?self.timeout,
            "Building vault decryption context"
        );

        let built = tokio::time::timeout(
            self.timeout,
            VaultContext::build(&self.providers, self.identity_match),
        )
        .await
        .unwrap_or(Err(ProviderError::Timeout {
            timeout: self.timeout,
        }));

        built.map(Arc::new).map_err(|err| {
            let err = CacheError::from(err);
            tracing::error!(
                error = %err,
                "Vault decryption unavailable; encrypted values will be replaced by placeholders"
            );
            err
        })
    }
}

impl std::fmt::Debug for ContextCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextCache")
            .field(
                "providers",
                &self
                    .providers
                    .iter()
                    .map(|p| p.provider_name())
                    .collect::<Vec<_>>(),
            )
            .field("identity_match", &self.identity_match)
            .field("timeout", &self.timeout)
            .field("state", &self.state())
            .finish()
    }
}
