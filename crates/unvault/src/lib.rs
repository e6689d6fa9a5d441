//! Inline vault decryption
//!
//! Finds encrypted vault tokens embedded in text, decrypts them with identities
//! loaded from pluggable secret providers (environment variables, files,
//! external commands), and substitutes the plaintext in place.
//!
//! Identities are loaded lazily, once, by a [`ContextCache`]. A token that
//! cannot be decrypted is replaced by a placeholder and reported, without
//! aborting the rest of the input.
//!
//! # Revealing text
//!
//! ```ignore
//! use std::sync::Arc;
//! use unvault::{ContextCache, ProviderConfig, ProviderRegistry, RevealConfig, RevealService};
//!
//! let config = RevealConfig::with_providers(vec![
//!     ProviderConfig::new("env").with_param("var", "VAULT_PASSWORD"),
//! ]);
//! let cache = ContextCache::from_config(&config, &ProviderRegistry::with_builtins());
//! let service = RevealService::new(Arc::new(cache));
//!
//! let outcome = service.reveal(&document).await;
//! for failure in &outcome.failures {
//!     eprintln!("{}: {}", failure.span, failure.message());
//! }
//! print!("{}", outcome.text);
//! ```

mod cache;
mod cipher;
mod config;
mod context;
mod error;
mod identity;
pub mod providers;
mod registry;
mod reveal;
pub mod scanner;
mod token;

pub use cache::{CacheState, ContextCache};
pub use cipher::KDF_ROUNDS;
pub use config::{
    DEFAULT_PLACEHOLDER, DEFAULT_TIMEOUT_SECS, IdentityMatch, ProviderConfig, RevealConfig,
};
pub use context::{SELF_TEST_PLAINTEXT, VaultContext};
pub use error::{CacheError, ConfigError, DecryptError, ProviderError, RevealError};
pub use identity::{DEFAULT_IDENTITY, SecretIdentity};
pub use registry::{ProviderFactory, ProviderRegistry};
pub use reveal::{RevealOutcome, RevealService, TokenFailure};
pub use token::{AES256_CIPHER, ANSIBLE_VAULT_TAG, EncryptedToken, Span, VAULT1_TAG};

// Re-export the provider trait and built-in providers
pub use providers::{EnvProvider, ExecProvider, FileProvider, SecretProvider};
