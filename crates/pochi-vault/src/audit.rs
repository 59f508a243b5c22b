//! Security audit log — bounded, encrypted, append-only from the caller's
//! perspective.
//!
//! Events live as one encrypted vault record (a list, not one record per
//! event). Appends truncate to the most recent 100 entries; the oldest
//! are silently dropped, no archival.

use pochi_crypto_core::CryptoError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::VaultError;
use crate::store::StorageMedium;
use crate::vault::{epoch_ms, SecureVault};

/// Record name of the event list.
pub const SECURITY_EVENTS_KEY: &str = "security_events";

/// Retention cap — appending beyond this drops the oldest entries.
pub const MAX_EVENTS: usize = 100;

/// What happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventKind {
    /// Vault session key derived and marker written.
    VaultInitialized,
    /// A transaction was authorized with a correct PIN.
    TransactionVerified,
    /// A PIN verification attempt failed.
    PinFailed,
    /// Consecutive failures reached the cap — lockout engaged.
    PinLocked,
    /// The in-memory session was dropped.
    SessionCleared,
    /// A backup bundle was exported.
    BackupExported,
    /// A backup bundle was imported and replayed.
    BackupImported,
}

/// One security-relevant occurrence.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEvent {
    /// Event tag.
    pub event: SecurityEventKind,
    /// Structured context — amounts, user ids, attempt counts.
    pub details: serde_json::Value,
    /// Epoch milliseconds.
    pub timestamp: u64,
}

/// Append an event to the log, truncating to the most recent
/// [`MAX_EVENTS`].
///
/// A stored list that does not decrypt under the current session key
/// belongs to a previous `(user_id, pin)` — it is abandoned and a fresh
/// list started, so re-keying the vault never blocks event logging.
///
/// # Errors
///
/// Propagates vault read/write failures; requires an initialized vault.
pub fn log_security_event<S: StorageMedium>(
    vault: &mut SecureVault<S>,
    event: SecurityEventKind,
    details: serde_json::Value,
) -> Result<(), VaultError> {
    let mut events: Vec<SecurityEvent> = match vault.get_secure(SECURITY_EVENTS_KEY) {
        Ok(events) => events.unwrap_or_default(),
        Err(VaultError::Crypto(CryptoError::Decryption)) => {
            warn!("event log unreadable under current session key, starting fresh");
            Vec::new()
        }
        Err(e) => return Err(e),
    };

    events.push(SecurityEvent {
        event,
        details,
        timestamp: epoch_ms(),
    });

    if events.len() > MAX_EVENTS {
        let excess = events.len().saturating_sub(MAX_EVENTS);
        events.drain(..excess);
    }

    debug!(?event, total = events.len(), "security event recorded");
    vault.set_secure(SECURITY_EVENTS_KEY, &events)
}

/// Read the full event list, oldest first.
///
/// # Errors
///
/// Propagates vault read failures; requires an initialized vault.
pub fn security_events<S: StorageMedium>(
    vault: &SecureVault<S>,
) -> Result<Vec<SecurityEvent>, VaultError> {
    Ok(vault.get_secure(SECURITY_EVENTS_KEY)?.unwrap_or_default())
}
