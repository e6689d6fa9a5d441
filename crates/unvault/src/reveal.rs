//! Inline token substitution
//!
//! [`RevealService`] rewrites text by replacing every vault token with its
//! plaintext. Per-token problems never abort a reveal: the token is replaced
//! by a placeholder and a [`TokenFailure`] is recorded.

use crate::cache::ContextCache;
use crate::config::DEFAULT_PLACEHOLDER;
use crate::context::VaultContext;
use crate::error::{CacheError, DecryptError, RevealError};
use crate::scanner::{parse_token, scan};
use crate::token::Span;
use std::sync::Arc;

/// A token that could not be revealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFailure {
    /// Byte range of the token in the input
    pub span: Span,
    /// Why the token was not decrypted
    pub error: DecryptError,
}

impl TokenFailure {
    /// Machine-readable error kind
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.error.kind()
    }

    /// Human-readable message
    #[must_use]
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

/// Result of revealing one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealOutcome {
    /// Input with every token replaced by plaintext or the placeholder
    pub text: String,
    /// Per-token failures, in input order
    pub failures: Vec<TokenFailure>,
    /// Set when the decryption context could not be obtained; every token
    /// that needed it was replaced by the placeholder
    pub cache_error: Option<CacheError>,
}

impl RevealOutcome {
    /// Whether every token was decrypted
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.cache_error.is_none()
    }
}

/// Replaces vault tokens in text using a shared [`ContextCache`].
///
/// Cloning is cheap; clones share the cache.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use unvault::{ContextCache, ProviderRegistry, RevealConfig, RevealService};
///
/// let config = RevealConfig::load(path)?;
/// let cache = ContextCache::from_config(&config, &ProviderRegistry::with_builtins());
/// let service = RevealService::new(Arc::new(cache)).with_placeholder(&config.placeholder);
///
/// let outcome = service.reveal("password: $ANSIBLE_VAULT;1.1;AES256\n6162...\n").await;
/// ```
#[derive(Debug, Clone)]
pub struct RevealService {
    cache: Arc<ContextCache>,
    placeholder: String,
}

impl RevealService {
    /// Create a service using [`DEFAULT_PLACEHOLDER`]
    #[must_use]
    pub fn new(cache: Arc<ContextCache>) -> Self {
        Self {
            cache,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }

    /// Replace failed tokens with `placeholder` instead
    #[must_use]
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// The text substituted for tokens that fail
    #[must_use]
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// The shared context cache
    #[must_use]
    pub const fn cache(&self) -> &Arc<ContextCache> {
        &self.cache
    }

    /// Replace every token in `text`.
    ///
    /// The context is only requested when the first well-formed token of a
    /// supported format is reached, so text without such tokens never
    /// triggers provider loading.
    /// Plaintext is inserted verbatim (invalid UTF-8 is replaced lossily) and
    /// is not scanned again.
    pub async fn reveal(&self, text: &str) -> RevealOutcome {
        let mut revealed = String::with_capacity(text.len());
        let mut failures = Vec::new();
        let mut cache_error = None;
        let mut context: Option<Arc<VaultContext>> = None;
        let mut cursor = 0;

        for (span, parsed) in scan(text) {
            revealed.push_str(&text[cursor..span.start]);
            cursor = span.end;

            let token = match parsed {
                Ok(token) => token,
                Err(error) => {
                    revealed.push_str(&self.placeholder);
                    failures.push(TokenFailure { span, error });
                    continue;
                }
            };

            if let Err(error) = token.ensure_supported() {
                tracing::debug!(%span, format = %token.header(), "Unsupported vault token");
                revealed.push_str(&self.placeholder);
                failures.push(TokenFailure { span, error });
                continue;
            }

            if cache_error.is_some() {
                revealed.push_str(&self.placeholder);
                continue;
            }

            let ctx = match &context {
                Some(ctx) => Arc::clone(ctx),
                None => match self.cache.get_context().await {
                    Ok(ctx) => {
                        context = Some(Arc::clone(&ctx));
                        ctx
                    }
                    Err(err) => {
                        cache_error = Some(err);
                        revealed.push_str(&self.placeholder);
                        continue;
                    }
                },
            };

            match ctx.decrypt(&token) {
                Ok(plaintext) => {
                    tracing::debug!(%span, "Revealed vault token");
                    revealed.push_str(&String::from_utf8_lossy(&plaintext));
                }
                Err(error) => {
                    tracing::debug!(%span, kind = error.kind(), "Vault token not decrypted");
                    revealed.push_str(&self.placeholder);
                    failures.push(TokenFailure { span, error });
                }
            }
        }
        revealed.push_str(&text[cursor..]);

        if !failures.is_empty() {
            tracing::warn!(count = failures.len(), "Some vault tokens could not be revealed");
        }

        RevealOutcome {
            text: revealed,
            failures,
            cache_error,
        }
    }

    /// Decrypt a single token, propagating any failure.
    ///
    /// `token_text` must contain exactly one token and nothing else apart
    /// from surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`RevealError::Decrypt`] for a malformed or undecryptable token
    /// and [`RevealError::Cache`] when the context is unavailable.
    pub async fn reveal_one(&self, token_text: &str) -> Result<String, RevealError> {
        let token = parse_token(token_text)?;
        token.ensure_supported()?;
        let context = self.cache.get_context().await?;
        let plaintext = context.decrypt(&token)?;
        Ok(String::from_utf8_lossy(&plaintext).into_owned())
    }
}
