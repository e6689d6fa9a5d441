//! Secret provider implementations
//!
//! Built-in providers, selected by the `type` of a
//! [`ProviderConfig`](crate::ProviderConfig) entry:
//!
//! - [`EnvProvider`] (`env`) - vault password from an environment variable
//! - [`FileProvider`] (`file`) - vault password from a file
//! - [`ExecProvider`] (`exec`) - vault password printed by an explicitly configured command

mod env;
mod exec;
mod file;

pub use env::EnvProvider;
pub use exec::ExecProvider;
pub use file::FileProvider;

use crate::error::ProviderError;
use crate::identity::{DEFAULT_IDENTITY, SecretIdentity};
use crate::ProviderConfig;
use async_trait::async_trait;

/// Capability that supplies vault identities.
///
/// A provider is constructed from its configuration entry; loading then needs
/// no further input. Loading may be slow (files, external commands) and is
/// only done once per [`ContextCache`](crate::ContextCache).
#[async_trait]
pub trait SecretProvider: Send + Sync {
    /// Provider type name, e.g. `"env"`
    fn provider_name(&self) -> &'static str;

    /// Load this provider's identities, in precedence order.
    async fn load_identities(&self) -> Result<Vec<SecretIdentity>, ProviderError>;
}

/// The `id` parameter of a provider entry, or [`DEFAULT_IDENTITY`].
///
/// Ids end up in token headers, so whitespace and `;` are rejected.
fn identity_id(config: &ProviderConfig) -> Result<String, ProviderError> {
    let id = config
        .param("id")
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(DEFAULT_IDENTITY);

    if id.chars().any(|c| c.is_whitespace() || c == ';') {
        return Err(ProviderError::invalid_config(
            &config.kind,
            format!("identity id '{id}' must not contain whitespace or ';'"),
        ));
    }
    Ok(id.to_string())
}

/// Wrap loaded key material, rejecting empty passwords.
fn identity_from_material(
    provider: &str,
    id: &str,
    material: Vec<u8>,
) -> Result<SecretIdentity, ProviderError> {
    if material.is_empty() {
        return Err(ProviderError::invalid_config(
            provider,
            format!("empty key material for identity '{id}'"),
        ));
    }
    Ok(SecretIdentity::new(id, material))
}
