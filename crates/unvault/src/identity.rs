//! Secret identities with automatic memory zeroing
//!
//! A [`SecretIdentity`] is a named vault password. Key material is wrapped in
//! `secrecy::SecretSlice` so it is zeroed on drop and never shows up in
//! `Debug` output.

use secrecy::{ExposeSecret, SecretSlice};
use std::fmt;

/// Identity name used when a provider is not given one.
pub const DEFAULT_IDENTITY: &str = "default";

/// A named secret able to attempt decryption of vault tokens.
///
/// Not `Clone`: identities move from the provider that loaded
/// them into a single [`VaultContext`](crate::VaultContext).
pub struct SecretIdentity {
    id: String,
    key_material: SecretSlice<u8>,
}

impl SecretIdentity {
    /// Create a new identity, moving the key material into secure storage.
    #[must_use]
    pub fn new(id: impl Into<String>, key_material: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            key_material: SecretSlice::from(key_material.into()),
        }
    }

    /// The identity's name (vault id)
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Expose the key material for key derivation.
    ///
    /// Callers must not log or persist the returned bytes.
    #[must_use]
    pub fn expose_key(&self) -> &[u8] {
        self.key_material.expose_secret()
    }

    /// Length of the key material without exposing it
    #[must_use]
    pub fn len(&self) -> usize {
        self.key_material.expose_secret().len()
    }

    /// Whether the key material is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.key_material.expose_secret().is_empty()
    }
}

impl fmt::Debug for SecretIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretIdentity")
            .field("id", &self.id)
            .field("key_material", &"[REDACTED]")
            .finish()
    }
}
