//! Cryptographic error types for `pochi-crypto-core`.

use thiserror::Error;

/// Errors produced by cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key derivation failed (bad salt, bad iteration count).
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Symmetric encryption failure (AES-256-GCM).
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Authentication tag verification failed — ciphertext tampered,
    /// wrong password, or corrupted envelope.
    #[error("decryption failed: authentication tag mismatch")]
    Decryption,

    /// Envelope encoding/decoding failure (bad base64, truncated bytes).
    #[error("envelope error: {0}")]
    Envelope(String),

    /// Invalid key material (wrong length, corrupted hex).
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// Secure memory allocation or CSPRNG failure.
    #[error("secure memory error: {0}")]
    SecureMemory(String),
}
