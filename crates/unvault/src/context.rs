//! Vault decryption context
//!
//! A [`VaultContext`] owns the identities loaded from every configured
//! provider and decrypts tokens by trying them in a fixed order. It is built
//! once, verified with a round-trip self-test, and then only read.

use crate::cipher::{Envelope, format_vault_text};
use crate::config::IdentityMatch;
use crate::error::{DecryptError, ProviderError};
use crate::identity::{DEFAULT_IDENTITY, SecretIdentity};
use crate::providers::SecretProvider;
use crate::scanner::parse_token;
use crate::token::{AES256_CIPHER, ANSIBLE_VAULT_TAG, EncryptedToken};
use std::sync::Arc;

/// Plaintext encrypted and decrypted by the construction self-test.
pub const SELF_TEST_PLAINTEXT: &str = "test";

/// Unlocked identities, in precedence order.
#[derive(Debug)]
pub struct VaultContext {
    identities: Vec<SecretIdentity>,
    identity_match: IdentityMatch,
}

impl VaultContext {
    /// Assemble a context from already-loaded identities, without a self-test.
    #[must_use]
    pub fn new(identities: Vec<SecretIdentity>, identity_match: IdentityMatch) -> Self {
        Self {
            identities,
            identity_match,
        }
    }

    /// Load identities from each provider in order and run the self-test.
    ///
    /// # Errors
    ///
    /// Propagates the first provider failure, or
    /// [`ProviderError::SelfTestFailed`] when the round-trip check fails.
    pub async fn build(
        providers: &[Arc<dyn SecretProvider>],
        identity_match: IdentityMatch,
    ) -> Result<Self, ProviderError> {
        let mut identities = Vec::new();
        for provider in providers {
            let loaded = provider.load_identities().await?;
            tracing::debug!(
                provider = provider.provider_name(),
                count = loaded.len(),
                "Loaded vault identities"
            );
            identities.extend(loaded);
        }

        let context = Self::new(identities, identity_match);
        context.self_test()?;

        tracing::info!(
            identities = ?context.identity_ids(),
            "Vault decryption context ready"
        );
        Ok(context)
    }

    /// Encrypt [`SELF_TEST_PLAINTEXT`] with the first identity and decrypt it
    /// through the whole context.
    ///
    /// Skipped, with a warning, when there are no identities.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::SelfTestFailed`] when the round-trip does not
    /// reproduce the test value.
    pub fn self_test(&self) -> Result<(), ProviderError> {
        let Some(first) = self.identities.first() else {
            tracing::warn!("No vault identities configured; every token will fail to decrypt");
            return Ok(());
        };

        let failed = |message: String| ProviderError::SelfTestFailed { message };

        let vault_text = self
            .encrypt(SELF_TEST_PLAINTEXT.as_bytes(), Some(first.id()))
            .map_err(|e| failed(format!("encryption failed: {e}")))?;
        if !vault_text.starts_with(&format!("${ANSIBLE_VAULT_TAG};")) {
            return Err(failed("encrypted text has no vault header".to_string()));
        }

        let token = parse_token(&vault_text)
            .map_err(|e| failed(format!("encrypted text does not parse: {e}")))?;
        let decrypted = self
            .decrypt(&token)
            .map_err(|e| failed(format!("decryption failed: {e}")))?;

        if decrypted != SELF_TEST_PLAINTEXT.as_bytes() {
            return Err(failed(format!(
                "round-trip produced {:?}, expected {SELF_TEST_PLAINTEXT:?}",
                String::from_utf8_lossy(&decrypted)
            )));
        }
        Ok(())
    }

    /// Identity ids in precedence order
    #[must_use]
    pub fn identity_ids(&self) -> Vec<&str> {
        self.identities.iter().map(SecretIdentity::id).collect()
    }

    /// Number of identities
    #[must_use]
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// Whether the context holds no identities
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Decrypt a token.
    ///
    /// Unknown formats are rejected before any identity is tried. Otherwise
    /// the first identity whose HMAC verifies decides the result; later
    /// identities are never consulted.
    ///
    /// # Errors
    ///
    /// [`DecryptError::UnsupportedFormat`], [`DecryptError::MalformedToken`],
    /// [`DecryptError::NoMatchingIdentity`] or [`DecryptError::IntegrityCheckFailed`].
    pub fn decrypt(&self, token: &EncryptedToken) -> Result<Vec<u8>, DecryptError> {
        token.ensure_supported()?;
        let envelope = Envelope::parse(&token.payload)?;
        let hint = token.identity_hint.as_deref();

        for identity in self.candidates(hint) {
            if let Some(plaintext) = envelope.open(identity.expose_key())? {
                tracing::debug!(identity = identity.id(), "Token decrypted");
                return Ok(plaintext);
            }
        }

        Err(DecryptError::NoMatchingIdentity {
            hint: hint.map(str::to_string),
        })
    }

    /// Encrypt `plaintext` into vault text.
    ///
    /// Uses the first identity named `identity_id`, or the first identity
    /// overall. The header carries the identity as a hint unless it is
    /// [`DEFAULT_IDENTITY`].
    ///
    /// # Errors
    ///
    /// Returns [`DecryptError::NoMatchingIdentity`] when no such identity exists.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        identity_id: Option<&str>,
    ) -> Result<String, DecryptError> {
        let identity = match identity_id {
            Some(id) => self.identities.iter().find(|identity| identity.id() == id),
            None => self.identities.first(),
        }
        .ok_or_else(|| DecryptError::NoMatchingIdentity {
            hint: identity_id.map(str::to_string),
        })?;

        let header = if identity.id() == DEFAULT_IDENTITY {
            format!("${ANSIBLE_VAULT_TAG};1.1;{AES256_CIPHER}")
        } else {
            format!("${ANSIBLE_VAULT_TAG};1.2;{AES256_CIPHER};{}", identity.id())
        };

        let envelope = Envelope::seal(plaintext, identity.expose_key());
        Ok(format_vault_text(&header, &envelope.to_payload()))
    }

    fn candidates<'a>(&'a self, hint: Option<&str>) -> Vec<&'a SecretIdentity> {
        let Some(hint) = hint else {
            return self.identities.iter().collect();
        };

        let (mut matching, others): (Vec<_>, Vec<_>) = self
            .identities
            .iter()
            .partition(|identity| identity.id() == hint);

        if self.identity_match == IdentityMatch::Prefer {
            matching.extend(others);
        }
        matching
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(ids: &[(&str, &str)], identity_match: IdentityMatch) -> VaultContext {
        VaultContext::new(
            ids.iter()
                .map(|(id, pw)| SecretIdentity::new(*id, *pw))
                .collect(),
            identity_match,
        )
    }

    fn encrypt_for(id: &str, password: &str, plaintext: &str) -> EncryptedToken {
        let single = context(&[(id, password)], IdentityMatch::Prefer);
        parse_token(&single.encrypt(plaintext.as_bytes(), None).unwrap()).unwrap()
    }

    #[test]
    fn test_decrypt_round_trip() {
        let ctx = context(&[("default", "pw")], IdentityMatch::Prefer);
        let text = ctx.encrypt(b"hello", None).unwrap();
        assert!(text.starts_with("$ANSIBLE_VAULT;1.1;AES256\n"));

        let token = parse_token(&text).unwrap();
        assert_eq!(ctx.decrypt(&token).unwrap(), b"hello");
    }

    #[test]
    fn test_encrypt_with_named_identity_writes_hint() {
        let ctx = context(&[("default", "a"), ("prod", "b")], IdentityMatch::Prefer);
        let text = ctx.encrypt(b"x", Some("prod")).unwrap();
        assert!(text.starts_with("$ANSIBLE_VAULT;1.2;AES256;prod\n"));

        assert!(matches!(
            ctx.encrypt(b"x", Some("staging")),
            Err(DecryptError::NoMatchingIdentity { .. })
        ));
    }

    #[test]
    fn test_unsupported_format_rejected_without_trying_identities() {
        let ctx = context(&[], IdentityMatch::Prefer);
        let mut token = encrypt_for("default", "pw", "v");

        token.format_tag = "UNKNOWN".to_string();
        let err = ctx.decrypt(&token).unwrap_err();
        assert_eq!(
            err,
            DecryptError::UnsupportedFormat {
                format: "UNKNOWN;AES256".to_string()
            }
        );

        token.format_tag = "VAULT1".to_string();
        token.cipher_id = "DES".to_string();
        assert_eq!(ctx.decrypt(&token).unwrap_err().kind(), "unsupported_format");
    }

    #[test]
    fn test_no_identities() {
        let ctx = context(&[], IdentityMatch::Prefer);
        let token = encrypt_for("default", "pw", "v");
        assert_eq!(
            ctx.decrypt(&token).unwrap_err(),
            DecryptError::NoMatchingIdentity { hint: None }
        );
    }

    #[test]
    fn test_later_identity_opens_token() {
        let ctx = context(
            &[("dev", "wrong"), ("ops", "also-wrong"), ("default", "pw")],
            IdentityMatch::Prefer,
        );
        let token = encrypt_for("default", "pw", "found");
        assert_eq!(ctx.decrypt(&token).unwrap(), b"found");
    }

    #[test]
    fn test_first_verifying_identity_wins() {
        // Both identities share a password; insertion order decides
        let ctx = context(&[("a", "same"), ("b", "same")], IdentityMatch::Prefer);
        let token = encrypt_for("default", "same", "v");
        assert_eq!(ctx.candidates(None)[0].id(), "a");
        assert_eq!(ctx.decrypt(&token).unwrap(), b"v");
    }

    #[test]
    fn test_hint_is_tried_first_then_others() {
        let ctx = context(&[("a", "1"), ("prod", "2"), ("b", "3")], IdentityMatch::Prefer);
        let order: Vec<_> = ctx.candidates(Some("prod")).iter().map(|i| i.id()).collect();
        assert_eq!(order, vec!["prod", "a", "b"]);

        // Hint names a missing identity: all identities are still tried
        let token = encrypt_for("staging", "3", "v");
        assert_eq!(token.identity_hint.as_deref(), Some("staging"));
        assert_eq!(ctx.decrypt(&token).unwrap(), b"v");
    }

    #[test]
    fn test_strict_matching_only_tries_hint() {
        let ctx = context(&[("a", "1"), ("prod", "2")], IdentityMatch::Strict);
        let order: Vec<_> = ctx.candidates(Some("prod")).iter().map(|i| i.id()).collect();
        assert_eq!(order, vec!["prod"]);
        assert_eq!(ctx.candidates(None).len(), 2);

        let token = encrypt_for("staging", "1", "v");
        assert_eq!(
            ctx.decrypt(&token).unwrap_err(),
            DecryptError::NoMatchingIdentity {
                hint: Some("staging".to_string())
            }
        );
    }

    #[test]
    fn test_malformed_payload() {
        let ctx = context(&[("default", "pw")], IdentityMatch::Prefer);
        let mut token = encrypt_for("default", "pw", "v");
        token.payload = b"only-one-field".to_vec();
        assert_eq!(ctx.decrypt(&token).unwrap_err().kind(), "malformed_token");
    }

    #[test]
    fn test_self_test() {
        assert!(context(&[("prod", "pw")], IdentityMatch::Strict).self_test().is_ok());
        assert!(context(&[], IdentityMatch::Prefer).self_test().is_ok());
    }

    #[test]
    fn test_accessors() {
        let ctx = context(&[("a", "1"), ("b", "2")], IdentityMatch::Prefer);
        assert_eq!(ctx.identity_ids(), vec!["a", "b"]);
        assert_eq!(ctx.len(), 2);
        assert!(!ctx.is_empty());

        let debug = format!("{ctx:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("\"1\""));
    }
}
