//! Vault error types for `pochi-vault`.

use pochi_crypto_core::CryptoError;
use thiserror::Error;

/// Errors produced by vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Cryptographic operation failed (delegated from crypto-core).
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The vault holds no session key — `initialize` has not been called
    /// (or the session was cleared).
    #[error("vault is not initialized")]
    NotInitialized,

    /// No PIN credential is stored — distinct from a wrong PIN.
    #[error("no PIN configured")]
    PinNotConfigured,

    /// A PIN being set up does not meet the format requirement.
    #[error("PIN must be exactly 6 digits")]
    InvalidPin,

    /// Too many failed PIN attempts — verification is refused until the
    /// lockout window elapses.
    #[error("verification locked: {remaining_ms}ms remaining")]
    Locked {
        /// Milliseconds remaining in the lockout window.
        remaining_ms: u64,
    },

    /// Underlying key-value medium read/write failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Record serialization/deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Backup bundle carries an unsupported version tag.
    #[error("unsupported backup version: {0}")]
    BackupVersion(String),

    /// I/O error from the filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
