//! Portable password-keyed encryption envelope.
//!
//! Wire format, base64-encoded:
//!
//! ```text
//! salt (16 bytes) || nonce (12 bytes) || ciphertext+tag (variable)
//! ```
//!
//! The salt and nonce are generated fresh for every [`seal`] call and are
//! never reused or derived. Both lengths are fixed, so the envelope is
//! self-describing: decryption needs only the password and the encoded
//! string, with the segments recovered by offset.

use crate::error::CryptoError;
use crate::kdf::{self, DEFAULT_ITERATIONS};
use crate::memory::SecretBuffer;
use crate::symmetric::{self, SealedData, NONCE_LEN, TAG_LEN};
use data_encoding::BASE64;
use rand::rngs::OsRng;
use rand::RngCore;

/// Envelope salt length in bytes.
pub const SALT_LEN: usize = 16;

/// Byte offset of the nonce within a decoded envelope.
pub const NONCE_OFFSET: usize = SALT_LEN;

/// Byte offset of the ciphertext within a decoded envelope.
pub const PAYLOAD_OFFSET: usize = SALT_LEN + NONCE_LEN;

/// Minimum decoded envelope length: salt + nonce + empty ciphertext + tag.
const MIN_ENVELOPE_LEN: usize = PAYLOAD_OFFSET + TAG_LEN;

/// Encrypt `plaintext` under `password`, returning a base64 envelope.
///
/// Derives a one-off 256-bit key from the password and a fresh random
/// salt (PBKDF2, 100,000 iterations), encrypts with AES-256-GCM under a
/// fresh random nonce, and encodes `salt || nonce || ciphertext+tag`.
///
/// # Errors
///
/// Returns `CryptoError::SecureMemory` if the CSPRNG fails, or the
/// underlying KDF/encryption errors.
pub fn seal(plaintext: &[u8], password: &[u8]) -> Result<String, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|e| CryptoError::SecureMemory(format!("CSPRNG fill failed: {e}")))?;

    let key = kdf::derive(password, &salt, DEFAULT_ITERATIONS)?;
    let sealed = symmetric::encrypt(plaintext, key.expose())?;

    let capacity = PAYLOAD_OFFSET.saturating_add(sealed.ciphertext.len());
    let mut raw = Vec::with_capacity(capacity);
    raw.extend_from_slice(&salt);
    raw.extend_from_slice(&sealed.nonce);
    raw.extend_from_slice(&sealed.ciphertext);

    Ok(BASE64.encode(&raw))
}

/// Decrypt a base64 envelope produced by [`seal`].
///
/// Splits the decoded bytes by fixed offsets, re-derives the key from the
/// password and the recovered salt, and decrypts. A failed authentication
/// tag — tampering, wrong password, corruption — yields
/// `CryptoError::Decryption` and never partial plaintext.
///
/// # Errors
///
/// Returns `CryptoError::Envelope` for malformed base64 or a truncated
/// envelope, and `CryptoError::Decryption` when authentication fails.
pub fn open(encoded: &str, password: &[u8]) -> Result<SecretBuffer, CryptoError> {
    let raw = BASE64
        .decode(encoded.as_bytes())
        .map_err(|e| CryptoError::Envelope(format!("invalid base64: {e}")))?;

    if raw.len() < MIN_ENVELOPE_LEN {
        return Err(CryptoError::Envelope(format!(
            "envelope too short: {} bytes (minimum {MIN_ENVELOPE_LEN})",
            raw.len()
        )));
    }

    let salt = &raw[..SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&raw[NONCE_OFFSET..PAYLOAD_OFFSET]);
    let ciphertext = raw[PAYLOAD_OFFSET..].to_vec();

    let key = kdf::derive(password, salt, DEFAULT_ITERATIONS)?;
    symmetric::decrypt(&SealedData { nonce, ciphertext }, key.expose())
}
