//! Parsed inline vault tokens

use crate::error::DecryptError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Header tag written by Ansible's `ansible-vault`.
pub const ANSIBLE_VAULT_TAG: &str = "ANSIBLE_VAULT";

/// Native tag accepted as an alias of [`ANSIBLE_VAULT_TAG`].
pub const VAULT1_TAG: &str = "VAULT1";

/// The only cipher identifier currently understood.
pub const AES256_CIPHER: &str = "AES256";

/// Byte range of a token inside scanned text, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Offset of the leading `$`
    pub start: usize,
    /// Offset one past the last body character
    pub end: usize,
}

impl Span {
    /// Create a new span
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Length of the span in bytes
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the span covers no bytes
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// An encrypted value lifted out of text by the [`scanner`](crate::scanner).
///
/// The `payload` is the body with its outer hex encoding removed. Its inner
/// layout belongs to the scheme named by `format_tag` and `cipher_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedToken {
    /// Scheme tag, e.g. `ANSIBLE_VAULT`
    pub format_tag: String,
    /// Format version, e.g. `1.1`
    pub version: String,
    /// Cipher identifier, e.g. `AES256`
    pub cipher_id: String,
    /// Identity that should be tried first
    pub identity_hint: Option<String>,
    /// Decoded body bytes
    pub payload: Vec<u8>,
}

impl EncryptedToken {
    /// Whether the tag is one of the vault schemes this crate decrypts
    #[must_use]
    pub fn is_known_format(&self) -> bool {
        matches!(self.format_tag.as_str(), ANSIBLE_VAULT_TAG | VAULT1_TAG)
    }

    /// Reject tokens this crate cannot decrypt, before any identity is needed.
    ///
    /// # Errors
    ///
    /// Returns [`DecryptError::UnsupportedFormat`] for an unknown tag or a
    /// cipher other than [`AES256_CIPHER`].
    pub fn ensure_supported(&self) -> Result<(), DecryptError> {
        if self.is_known_format() && self.cipher_id == AES256_CIPHER {
            return Ok(());
        }
        Err(DecryptError::UnsupportedFormat {
            format: format!("{};{}", self.format_tag, self.cipher_id),
        })
    }

    /// Header rendered back to text, without the trailing newline
    #[must_use]
    pub fn header(&self) -> String {
        let mut header = format!("${};{};{}", self.format_tag, self.version, self.cipher_id);
        if let Some(hint) = &self.identity_hint {
            header.push(';');
            header.push_str(hint);
        }
        header
    }
}
