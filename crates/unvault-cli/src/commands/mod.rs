//! Command implementations

pub mod encrypt;
pub mod reveal;

use crate::cli::{Cli, CliError};
use std::sync::Arc;
use unvault::{ContextCache, ProviderRegistry, RevealConfig};

/// Load the configuration named on the command line and apply flag overrides.
///
/// Without `--config` no providers are configured and every token fails.
pub fn load_config(cli: &Cli) -> Result<RevealConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => RevealConfig::load(path)?,
        None => {
            tracing::warn!("No configuration given; vault tokens cannot be decrypted");
            RevealConfig::default()
        }
    };

    if let Some(placeholder) = &cli.placeholder {
        config.placeholder.clone_from(placeholder);
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    Ok(config)
}

/// Create the shared context cache for one run
pub fn build_cache(config: &RevealConfig) -> Arc<ContextCache> {
    Arc::new(ContextCache::from_config(
        config,
        &ProviderRegistry::with_builtins(),
    ))
}
