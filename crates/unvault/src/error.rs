//! Error taxonomy for token scanning, provider setup and decryption
//!
//! All errors are `Clone`: a failed context construction is remembered by the
//! [`ContextCache`](crate::ContextCache) and replayed to every later caller.

use std::time::Duration;
use thiserror::Error;

/// Failure while loading identities from a secret provider or assembling a
/// [`VaultContext`](crate::VaultContext).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Provider configuration is missing a parameter, names an unknown
    /// provider type, or produced unusable key material.
    #[error("Invalid configuration for provider '{provider}': {message}")]
    InvalidConfig {
        /// Provider type name (e.g. `env`, `file`, `exec`)
        provider: String,
        /// What was wrong
        message: String,
    },

    /// Reading a file or running an external command failed.
    #[error("Provider '{provider}' failed: {message}")]
    Io {
        /// Provider type name
        provider: String,
        /// Underlying failure, stringified so the error stays `Clone`
        message: String,
    },

    /// Context construction did not finish within the configured timeout.
    #[error("Provider setup timed out after {timeout:?}")]
    Timeout {
        /// Configured bound on provider setup
        timeout: Duration,
    },

    /// The encrypt/decrypt round-trip run after loading identities failed.
    #[error("Vault self-test failed: {message}")]
    SelfTestFailed {
        /// Why the round-trip did not reproduce the test value
        message: String,
    },
}

impl ProviderError {
    /// Create an invalid configuration error
    #[must_use]
    pub fn invalid_config(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error
    #[must_use]
    pub fn io(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Io {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable name of the error kind
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "invalid_config",
            Self::Io { .. } => "io_failure",
            Self::Timeout { .. } => "timeout",
            Self::SelfTestFailed { .. } => "self_test_failed",
        }
    }
}

/// Per-token failure. Never aborts a reveal; the token is replaced by a
/// placeholder and the error is reported alongside the output.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecryptError {
    /// Token tag or cipher is not one this build can decrypt.
    #[error("Unsupported vault format: {format}")]
    UnsupportedFormat {
        /// The tag and cipher found in the header, e.g. `UNKNOWN;AES256`
        format: String,
    },

    /// No loaded identity could open the token.
    #[error("No matching identity could decrypt the token{}", hint_suffix(.hint.as_deref()))]
    NoMatchingIdentity {
        /// Identity hint carried by the token header, if any
        hint: Option<String>,
    },

    /// The HMAC matched but the decrypted body was not validly padded.
    #[error("Integrity check failed: {message}")]
    IntegrityCheckFailed {
        /// Details of the failed check
        message: String,
    },

    /// Token header or body could not be parsed.
    #[error("Malformed token: {message}")]
    MalformedToken {
        /// What was wrong with the token
        message: String,
    },
}

fn hint_suffix(hint: Option<&str>) -> String {
    hint.map_or_else(String::new, |h| format!(" (hint '{h}')"))
}

impl DecryptError {
    /// Create a malformed token error
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedToken {
            message: message.into(),
        }
    }

    /// Stable machine-readable name of the error kind
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat { .. } => "unsupported_format",
            Self::NoMatchingIdentity { .. } => "no_matching_identity",
            Self::IntegrityCheckFailed { .. } => "integrity_check_failed",
            Self::MalformedToken { .. } => "malformed_token",
        }
    }
}

/// Failure to obtain a [`VaultContext`](crate::VaultContext) from the cache.
///
/// Once returned, the same error is returned for every later call on that cache.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// A provider could not be loaded, or construction timed out.
    #[error("Decryption setup failed: {0}")]
    ProviderSetupFailed(#[source] ProviderError),

    /// Identities loaded but the round-trip self-test failed.
    #[error("Decryption setup failed: {message}")]
    SelfTestFailed {
        /// Self-test failure details
        message: String,
    },
}

impl CacheError {
    /// Stable machine-readable name of the error kind
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ProviderSetupFailed(_) => "provider_setup_failed",
            Self::SelfTestFailed { .. } => "self_test_failed",
        }
    }
}

impl From<ProviderError> for CacheError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::SelfTestFailed { message } => Self::SelfTestFailed { message },
            other => Self::ProviderSetupFailed(other),
        }
    }
}

/// Failure to load a [`RevealConfig`](crate::RevealConfig).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read configuration '{path}': {message}")]
    Read {
        /// Path that was read
        path: String,
        /// Underlying I/O failure
        message: String,
    },

    /// The configuration is not valid YAML for the expected schema
    #[error("Invalid configuration: {message}")]
    Parse {
        /// Parser message, including the location when known
        message: String,
    },
}

/// Error from [`RevealService::reveal_one`](crate::RevealService::reveal_one),
/// which propagates instead of substituting a placeholder.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RevealError {
    /// The decryption context is unavailable
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The token could not be decrypted
    #[error(transparent)]
    Decrypt(#[from] DecryptError),
}

impl RevealError {
    /// Stable machine-readable name of the error kind
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Cache(err) => err.kind(),
            Self::Decrypt(err) => err.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_messages() {
        let err = ProviderError::invalid_config("env", "missing parameter 'var'");
        let msg = err.to_string();
        assert!(msg.contains("env"));
        assert!(msg.contains("missing parameter 'var'"));
        assert_eq!(err.kind(), "invalid_config");

        let err = ProviderError::Timeout {
            timeout: Duration::from_secs(5),
        };
        assert!(err.to_string().ends_with("after 5s"));
        assert_eq!(err.kind(), "timeout");
    }

    #[test]
    fn test_no_matching_identity_message() {
        let err = DecryptError::NoMatchingIdentity { hint: None };
        assert_eq!(
            err.to_string(),
            "No matching identity could decrypt the token"
        );

        let err = DecryptError::NoMatchingIdentity {
            hint: Some("prod".to_string()),
        };
        assert!(err.to_string().ends_with("(hint 'prod')"));
        assert_eq!(err.kind(), "no_matching_identity");
    }

    #[test]
    fn test_cache_error_from_provider_error() {
        let err: CacheError = ProviderError::io("file", "permission denied").into();
        assert!(matches!(
            err,
            CacheError::ProviderSetupFailed(ProviderError::Io { .. })
        ));
        assert_eq!(err.kind(), "provider_setup_failed");

        let err: CacheError = ProviderError::SelfTestFailed {
            message: "mismatch".to_string(),
        }
        .into();
        assert_eq!(
            err,
            CacheError::SelfTestFailed {
                message: "mismatch".to_string()
            }
        );
    }

    #[test]
    fn test_reveal_error_kind_delegates() {
        let err = RevealError::from(DecryptError::malformed("truncated"));
        assert_eq!(err.kind(), "malformed_token");
        assert_eq!(err.to_string(), "Malformed token: truncated");

        let err = RevealError::from(CacheError::from(ProviderError::Timeout {
            timeout: Duration::from_millis(250),
        }));
        assert!(err.to_string().contains("250ms"));
        assert_eq!(err.kind(), "provider_setup_failed");
    }
}
