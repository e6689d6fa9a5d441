//! Declarative reveal configuration
//!
//! ```yaml
//! providers:
//!   - type: env
//!     params: { var: VAULT_PASSWORD }
//!   - type: file
//!     params: { path: ~/.vault/prod, id: prod }
//! placeholder: "<<DECRYPTION_FAILED>>"
//! timeout_secs: 30
//! identity_match: prefer
//! ```

use crate::error::{ConfigError, ProviderError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Text substituted for tokens that could not be decrypted.
pub const DEFAULT_PLACEHOLDER: &str = "<<DECRYPTION_FAILED>>";

/// Default bound on provider setup, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// One installed secret provider: its type name and string parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Provider type, e.g. `env`, `file`, `exec`
    #[serde(rename = "type")]
    pub kind: String,

    /// Provider-specific parameters
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl ProviderConfig {
    /// Create a provider entry with no parameters
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add a parameter
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Look up an optional parameter
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Look up a required, non-empty parameter
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidConfig`] when the parameter is absent or blank.
    pub fn require(&self, key: &str) -> Result<&str, ProviderError> {
        self.param(key)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::invalid_config(&self.kind, format!("missing parameter '{key}'"))
            })
    }

    /// Interpret an optional boolean parameter (`true`/`false`/`yes`/`no`/`1`/`0`)
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidConfig`] for any other value.
    pub fn flag(&self, key: &str) -> Result<bool, ProviderError> {
        match self.param(key).map(|v| v.trim().to_ascii_lowercase()) {
            None => Ok(false),
            Some(value) => match value.as_str() {
                "true" | "yes" | "1" => Ok(true),
                "false" | "no" | "0" | "" => Ok(false),
                other => Err(ProviderError::invalid_config(
                    &self.kind,
                    format!("parameter '{key}' must be a boolean, got '{other}'"),
                )),
            },
        }
    }
}

/// How a token's identity hint restricts which identities are tried.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IdentityMatch {
    /// Try hint-matching identities first, then all others in order
    #[default]
    Prefer,
    /// Only try identities whose id equals the hint
    Strict,
}

/// Everything needed to build a decryption context and reveal text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RevealConfig {
    /// Installed providers, in precedence order
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    /// Placeholder for tokens that fail to decrypt
    #[serde(default = "default_placeholder")]
    pub placeholder: String,

    /// Bound on provider setup, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Identity hint handling
    #[serde(default)]
    pub identity_match: IdentityMatch,
}

fn default_placeholder() -> String {
    DEFAULT_PLACEHOLDER.to_string()
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            placeholder: default_placeholder(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            identity_match: IdentityMatch::default(),
        }
    }
}

impl RevealConfig {
    /// Create a configuration with the given providers and defaults elsewhere
    #[must_use]
    pub fn with_providers(providers: Vec<ProviderConfig>) -> Self {
        Self {
            providers,
            ..Self::default()
        }
    }

    /// Parse configuration from YAML (JSON is accepted too)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the document does not match the schema.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Load configuration from a file
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if it is not valid configuration.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = Self::from_yaml_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            providers = config.providers.len(),
            "Loaded reveal configuration"
        );
        Ok(config)
    }

    /// Provider setup timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
