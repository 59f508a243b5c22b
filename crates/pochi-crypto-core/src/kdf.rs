//! PBKDF2-HMAC-SHA256 key derivation with purpose domain separation.
//!
//! This module provides:
//! - [`derive`] — derive a 256-bit key from a secret + salt
//! - [`derive_wallet_key`] — purpose-separated wallet keys from `(user_id, pin)`
//! - [`KeyPurpose`] — Transaction / Storage / Backup domain selector
//!
//! The iteration count is deliberately high (100,000) so that offline
//! brute force of a low-entropy 6-digit PIN stays expensive. Derivation is
//! fully deterministic: identical `(secret, salt, iterations)` inputs
//! always produce the same key, which is what lets a vault re-derive its
//! storage key from the same `(user_id, pin)` across sessions.

use crate::error::CryptoError;
use crate::memory::SecretBytes;
use ring::pbkdf2;
use std::num::NonZeroU32;
use zeroize::Zeroize;

/// Output length of the KDF in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Default PBKDF2 iteration count.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Minimum salt length in bytes.
pub const MIN_SALT_LEN: usize = 16;

/// Key usage domain. A key derived for one purpose is useless for another:
/// the purpose label is mixed into the salt material, so `Transaction`,
/// `Storage`, and `Backup` keys never coincide even for the same PIN.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyPurpose {
    /// Authorizes individual transactions.
    Transaction,
    /// Encrypts vault records at rest.
    Storage,
    /// Seals exported backup bundles.
    Backup,
}

impl KeyPurpose {
    /// Fixed domain-separation label mixed into the salt.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Transaction => "transaction",
            Self::Storage => "storage",
            Self::Backup => "backup",
        }
    }
}

/// Derive a 256-bit key from `secret` and `salt` using PBKDF2-HMAC-SHA256.
///
/// # Errors
///
/// Returns `CryptoError::KeyDerivation` if the salt is shorter than
/// 16 bytes or the iteration count is zero.
pub fn derive(
    secret: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Result<SecretBytes<KEY_LEN>, CryptoError> {
    if salt.len() < MIN_SALT_LEN {
        return Err(CryptoError::KeyDerivation(format!(
            "salt too short: {} bytes (minimum {MIN_SALT_LEN})",
            salt.len()
        )));
    }
    let rounds = NonZeroU32::new(iterations)
        .ok_or_else(|| CryptoError::KeyDerivation("iteration count must be non-zero".into()))?;

    let mut output = [0u8; KEY_LEN];
    pbkdf2::derive(pbkdf2::PBKDF2_HMAC_SHA256, rounds, salt, secret, &mut output);

    let key = SecretBytes::new(output);
    output.zeroize();
    Ok(key)
}

/// Derive a purpose-separated wallet key from `(user_id, pin)`.
///
/// The salt is built deterministically from the user id and the purpose
/// label — no stored salt is needed, so the same `(user_id, pin, purpose)`
/// always re-derives the same key. This is the derivation behind the
/// vault's session storage key.
///
/// # Errors
///
/// Returns `CryptoError::KeyDerivation` if the derivation parameters are
/// invalid (propagated from [`derive`]).
pub fn derive_wallet_key(
    user_id: &str,
    pin: &str,
    purpose: KeyPurpose,
) -> Result<SecretBytes<KEY_LEN>, CryptoError> {
    // The fixed prefix guarantees the minimum salt length even for an
    // empty user id.
    let mut salt = format!("pochi-wallet-key:{}:{user_id}", purpose.label()).into_bytes();
    let result = derive(pin.as_bytes(), &salt, DEFAULT_ITERATIONS);
    salt.zeroize();
    result
}
