//! PIN credential hashing and verification.
//!
//! A PIN is never persisted — only a salted PBKDF2-HMAC-SHA256 derivation
//! of it. Verification re-derives with the stored salt and compares in
//! constant time (`ring::constant_time`), closing the timing side channel
//! a direct byte comparison would open.

use crate::error::CryptoError;
use crate::kdf::{self, DEFAULT_ITERATIONS, MIN_SALT_LEN};
use data_encoding::HEXLOWER;
use rand::rngs::OsRng;
use rand::RngCore;
use ring::constant_time;
use serde::{Deserialize, Serialize};

/// Stored PIN credential — hex-encoded salted hash plus its salt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinCredential {
    /// Hex-encoded 32-byte PBKDF2 output.
    pub hash: String,
    /// Hex-encoded 16-byte salt.
    pub salt: String,
}

/// Hash a PIN for storage.
///
/// When `salt` is `None` a fresh random 16-byte salt is generated; passing
/// an existing salt makes the hash deterministic, which is how
/// verification works.
///
/// # Errors
///
/// Returns `CryptoError::KeyDerivation` if the salt is malformed hex or
/// too short, or `CryptoError::SecureMemory` if the CSPRNG fails.
pub fn hash_pin(pin: &str, salt: Option<&str>) -> Result<PinCredential, CryptoError> {
    let salt_bytes = match salt {
        Some(hex) => decode_salt(hex)?,
        None => {
            let mut fresh = vec![0u8; MIN_SALT_LEN];
            OsRng
                .try_fill_bytes(&mut fresh)
                .map_err(|e| CryptoError::SecureMemory(format!("CSPRNG fill failed: {e}")))?;
            fresh
        }
    };

    let derived = kdf::derive(pin.as_bytes(), &salt_bytes, DEFAULT_ITERATIONS)?;
    Ok(PinCredential {
        hash: HEXLOWER.encode(derived.expose()),
        salt: HEXLOWER.encode(&salt_bytes),
    })
}

/// Verify a PIN against a stored credential.
///
/// Re-derives with the stored salt and compares the hashes in constant
/// time. A malformed stored hash or salt is an error, not a silent `false`
/// — corrupt credentials should surface, not masquerade as a wrong PIN.
///
/// # Errors
///
/// Returns `CryptoError::InvalidKeyMaterial` if the stored hash or salt is
/// not valid hex, or `CryptoError::KeyDerivation` if derivation fails.
pub fn verify_pin(pin: &str, stored_hash: &str, stored_salt: &str) -> Result<bool, CryptoError> {
    let salt_bytes = decode_salt(stored_salt)?;
    let expected = HEXLOWER
        .decode(stored_hash.as_bytes())
        .map_err(|e| CryptoError::InvalidKeyMaterial(format!("stored hash is not hex: {e}")))?;

    let derived = kdf::derive(pin.as_bytes(), &salt_bytes, DEFAULT_ITERATIONS)?;
    Ok(constant_time::verify_slices_are_equal(derived.expose(), &expected).is_ok())
}

fn decode_salt(hex: &str) -> Result<Vec<u8>, CryptoError> {
    let bytes = HEXLOWER
        .decode(hex.as_bytes())
        .map_err(|e| CryptoError::InvalidKeyMaterial(format!("stored salt is not hex: {e}")))?;
    if bytes.len() < MIN_SALT_LEN {
        return Err(CryptoError::InvalidKeyMaterial(format!(
            "stored salt too short: {} bytes (minimum {MIN_SALT_LEN})",
            bytes.len()
        )));
    }
    Ok(bytes)
}
