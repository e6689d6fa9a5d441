//! AES256 vault cipher
//!
//! Compatible with `ansible-vault` format 1.1/1.2:
//!
//! - PBKDF2-HMAC-SHA256, 10000 rounds, 32-byte random salt, 80 bytes of output
//!   split into an AES key, an HMAC key and a CTR IV
//! - AES-256-CTR over PKCS#7-padded plaintext
//! - HMAC-SHA256 over the ciphertext, verified before decrypting
//!
//! The token payload is `hex(salt) "\n" hex(hmac) "\n" hex(ciphertext)`, and the
//! vault text body is that payload hex-encoded again and wrapped at 80 columns.

use crate::error::DecryptError;
use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use rand::RngCore;
use secrecy::zeroize::Zeroize;
use sha2::Sha256;

type Aes256Ctr = ctr::Ctr128BE<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// PBKDF2 iteration count used by the vault format.
pub const KDF_ROUNDS: u32 = 10_000;

const SALT_LEN: usize = 32;
const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;
const BLOCK_LEN: usize = 16;
/// Hex digits per body line written by [`format_vault_text`]
pub(crate) const LINE_WIDTH: usize = 80;

/// Keys derived from one password and salt. Zeroed on drop.
struct DerivedKeys {
    material: [u8; 2 * KEY_LEN + IV_LEN],
}

impl DerivedKeys {
    fn derive(password: &[u8], salt: &[u8]) -> Self {
        let mut material = [0u8; 2 * KEY_LEN + IV_LEN];
        pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, KDF_ROUNDS, &mut material);
        Self { material }
    }

    fn cipher_key(&self) -> &[u8] {
        &self.material[..KEY_LEN]
    }

    fn hmac_key(&self) -> &[u8] {
        &self.material[KEY_LEN..2 * KEY_LEN]
    }

    fn iv(&self) -> &[u8] {
        &self.material[2 * KEY_LEN..]
    }

    fn mac(&self) -> HmacSha256 {
        #[allow(clippy::expect_used)]
        let mac = HmacSha256::new_from_slice(self.hmac_key()).expect("HMAC accepts any key length");
        mac
    }

    fn apply_keystream(&self, buf: &mut [u8]) {
        #[allow(clippy::expect_used)]
        let mut cipher = Aes256Ctr::new_from_slices(self.cipher_key(), self.iv())
            .expect("derived key and IV have fixed lengths");
        cipher.apply_keystream(buf);
    }
}

impl Drop for DerivedKeys {
    fn drop(&mut self) {
        self.material.zeroize();
    }
}

/// Salt, HMAC and ciphertext of one vault token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    salt: Vec<u8>,
    hmac: Vec<u8>,
    ciphertext: Vec<u8>,
}

impl Envelope {
    /// Parse a token payload.
    ///
    /// # Errors
    ///
    /// Returns [`DecryptError::MalformedToken`] when the payload is not three
    /// newline-separated hex fields.
    pub fn parse(payload: &[u8]) -> Result<Self, DecryptError> {
        let text = std::str::from_utf8(payload)
            .map_err(|_| DecryptError::malformed("payload is not ASCII hex"))?;

        let mut fields = text.splitn(3, '\n');
        let (Some(salt), Some(hmac), Some(ciphertext)) =
            (fields.next(), fields.next(), fields.next())
        else {
            return Err(DecryptError::malformed(
                "payload must contain salt, hmac and ciphertext",
            ));
        };

        let decode = |name: &str, value: &str| {
            hex::decode(value.trim_end())
                .map_err(|e| DecryptError::malformed(format!("invalid {name}: {e}")))
        };

        let envelope = Self {
            salt: decode("salt", salt)?,
            hmac: decode("hmac", hmac)?,
            ciphertext: decode("ciphertext", ciphertext)?,
        };

        if envelope.salt.is_empty() || envelope.hmac.is_empty() {
            return Err(DecryptError::malformed("payload has an empty salt or hmac"));
        }
        Ok(envelope)
    }

    /// Encode back into a token payload
    #[must_use]
    pub fn to_payload(&self) -> Vec<u8> {
        format!(
            "{}\n{}\n{}",
            hex::encode(&self.salt),
            hex::encode(&self.hmac),
            hex::encode(&self.ciphertext)
        )
        .into_bytes()
    }

    /// Encrypt `plaintext` under `password` with a fresh random salt.
    #[must_use]
    pub fn seal(plaintext: &[u8], password: &[u8]) -> Self {
        let mut salt = vec![0u8; SALT_LEN];
        rand::rngs::OsRng.fill_bytes(&mut salt);
        Self::seal_with_salt(plaintext, password, salt)
    }

    /// Encrypt `plaintext` under `password` with the given salt.
    #[must_use]
    pub fn seal_with_salt(plaintext: &[u8], password: &[u8], salt: Vec<u8>) -> Self {
        let keys = DerivedKeys::derive(password, &salt);

        let mut ciphertext = pad(plaintext);
        keys.apply_keystream(&mut ciphertext);

        let mut mac = keys.mac();
        mac.update(&ciphertext);
        let hmac = mac.finalize().into_bytes().to_vec();

        Self {
            salt,
            hmac,
            ciphertext,
        }
    }

    /// Try to decrypt with one password.
    ///
    /// Returns `Ok(None)` when the HMAC does not verify, meaning the password
    /// belongs to a different identity.
    ///
    /// # Errors
    ///
    /// Returns [`DecryptError::IntegrityCheckFailed`] when the HMAC verifies
    /// but the decrypted padding is invalid.
    pub fn open(&self, password: &[u8]) -> Result<Option<Vec<u8>>, DecryptError> {
        let keys = DerivedKeys::derive(password, &self.salt);

        let mut mac = keys.mac();
        mac.update(&self.ciphertext);
        if mac.verify_slice(&self.hmac).is_err() {
            return Ok(None);
        }

        let mut plaintext = self.ciphertext.clone();
        keys.apply_keystream(&mut plaintext);
        unpad(&mut plaintext)?;
        Ok(Some(plaintext))
    }
}

/// Render a header and payload as vault text (body hex-encoded, 80 columns).
#[must_use]
pub fn format_vault_text(header: &str, payload: &[u8]) -> String {
    let body = hex::encode(payload);
    let mut text = String::with_capacity(header.len() + body.len() + body.len() / LINE_WIDTH + 2);
    text.push_str(header);
    text.push('\n');
    for line in body.as_bytes().chunks(LINE_WIDTH) {
        text.push_str(&String::from_utf8_lossy(line));
        text.push('\n');
    }
    text
}

fn pad(plaintext: &[u8]) -> Vec<u8> {
    let pad_len = BLOCK_LEN - plaintext.len() % BLOCK_LEN;
    let mut padded = Vec::with_capacity(plaintext.len() + pad_len);
    padded.extend_from_slice(plaintext);
    // pad_len is at most BLOCK_LEN
    #[allow(clippy::cast_possible_truncation)]
    padded.resize(plaintext.len() + pad_len, pad_len as u8);
    padded
}

fn unpad(buf: &mut Vec<u8>) -> Result<(), DecryptError> {
    let invalid = || DecryptError::IntegrityCheckFailed {
        message: "invalid PKCS#7 padding".to_string(),
    };

    if buf.is_empty() || buf.len() % BLOCK_LEN != 0 {
        return Err(invalid());
    }
    let pad_len = usize::from(buf[buf.len() - 1]);
    if pad_len == 0 || pad_len > BLOCK_LEN {
        return Err(invalid());
    }
    let body_len = buf.len() - pad_len;
    if buf[body_len..].iter().any(|&b| usize::from(b) != pad_len) {
        return Err(invalid());
    }
    buf.truncate(body_len);
    Ok(())
}
