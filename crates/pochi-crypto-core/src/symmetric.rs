//! AES-256-GCM authenticated encryption.
//!
//! Raw keyed encryption with a random 96-bit nonce per call. Callers who
//! want the portable password-keyed wire format should use
//! [`crate::envelope`], which composes this module with the KDF.

use crate::error::CryptoError;
use crate::memory::SecretBuffer;
use rand::rngs::OsRng;
use rand::RngCore;
use ring::aead;
use zeroize::Zeroize;

/// AES-256-GCM nonce length in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// AES-256-GCM authentication tag length in bytes (128 bits).
pub const TAG_LEN: usize = 16;

/// AES-256-GCM key length in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Authenticated ciphertext: random nonce plus `ciphertext || tag`.
///
/// The nonce must travel with the ciphertext; the trailing tag
/// authenticates it, so any modification makes decryption fail rather
/// than yield altered plaintext.
#[must_use = "encrypted data must be stored or transmitted"]
#[derive(Clone, Debug)]
pub struct SealedData {
    /// 96-bit random nonce, unique per encryption call.
    pub nonce: [u8; NONCE_LEN],
    /// Ciphertext with the 128-bit authentication tag appended.
    pub ciphertext: Vec<u8>,
}

/// Encrypt `plaintext` under a 256-bit key with a fresh random nonce.
///
/// # Errors
///
/// Returns `CryptoError::Encryption` if the key is not exactly 32 bytes
/// or the underlying AEAD operation fails, and `CryptoError::SecureMemory`
/// if the CSPRNG fails.
pub fn encrypt(plaintext: &[u8], key: &[u8]) -> Result<SealedData, CryptoError> {
    let sealing_key = aead_key(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng
        .try_fill_bytes(&mut nonce_bytes)
        .map_err(|e| CryptoError::SecureMemory(format!("CSPRNG fill failed: {e}")))?;
    let nonce = aead::Nonce::assume_unique_for_key(nonce_bytes);

    let mut in_out = plaintext.to_vec();
    if sealing_key
        .seal_in_place_append_tag(nonce, aead::Aad::empty(), &mut in_out)
        .is_err()
    {
        in_out.zeroize();
        return Err(CryptoError::Encryption("AES-256-GCM seal failed".into()));
    }

    Ok(SealedData {
        nonce: nonce_bytes,
        ciphertext: in_out,
    })
}

/// Decrypt and authenticate [`SealedData`].
///
/// Returns the plaintext in a [`SecretBuffer`] (zeroized on drop). On a
/// tag mismatch — tampered data, wrong key — nothing is returned: there
/// is no partial or garbage plaintext path.
///
/// # Errors
///
/// Returns `CryptoError::Encryption` for a malformed key and
/// `CryptoError::Decryption` when authentication fails.
pub fn decrypt(sealed: &SealedData, key: &[u8]) -> Result<SecretBuffer, CryptoError> {
    let opening_key = aead_key(key)?;
    let nonce = aead::Nonce::assume_unique_for_key(sealed.nonce);

    let mut in_out = sealed.ciphertext.clone();
    let plaintext = opening_key
        .open_in_place(nonce, aead::Aad::empty(), &mut in_out)
        .map_err(|_| CryptoError::Decryption)?;

    let result = SecretBuffer::new(plaintext)?;
    in_out.zeroize();
    Ok(result)
}

fn aead_key(key: &[u8]) -> Result<aead::LessSafeKey, CryptoError> {
    if key.len() != KEY_LEN {
        return Err(CryptoError::Encryption(format!(
            "invalid key length: {} bytes (expected {KEY_LEN})",
            key.len()
        )));
    }
    let unbound = aead::UnboundKey::new(&aead::AES_256_GCM, key)
        .map_err(|_| CryptoError::Encryption("failed to create AES-256-GCM key".into()))?;
    Ok(aead::LessSafeKey::new(unbound))
}
