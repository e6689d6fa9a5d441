//! Environment variable secret provider

use super::{SecretProvider, identity_from_material, identity_id};
use crate::error::ProviderError;
use crate::identity::SecretIdentity;
use crate::ProviderConfig;
use async_trait::async_trait;

/// Loads one identity from an environment variable.
///
/// Parameters: `var` (required) names the variable, `id` names the identity.
#[derive(Debug, Clone)]
pub struct EnvProvider {
    var: String,
    id: String,
}

impl EnvProvider {
    /// Create a provider reading `var` as identity `id`
    #[must_use]
    pub fn new(var: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            var: var.into(),
            id: id.into(),
        }
    }

    /// Build from a configuration entry
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidConfig`] when `var` is missing or `id`
    /// is not a valid identity id.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self::new(config.require("var")?, identity_id(config)?))
    }
}

#[async_trait]
impl SecretProvider for EnvProvider {
    fn provider_name(&self) -> &'static str {
        "env"
    }

    async fn load_identities(&self) -> Result<Vec<SecretIdentity>, ProviderError> {
        let value = std::env::var(&self.var).map_err(|_| {
            ProviderError::invalid_config(
                self.provider_name(),
                format!("environment variable '{}' is not set", self.var),
            )
        })?;

        tracing::debug!(var = %self.var, id = %self.id, "Loaded vault identity from environment");
        Ok(vec![identity_from_material(
            self.provider_name(),
            &self.id,
            value.into_bytes(),
        )?])
    }
}
