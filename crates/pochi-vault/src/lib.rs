//! `pochi-vault` — Secure vault business logic for POCHI.
//!
//! An encrypted keyed store over an untrusted key-value medium, plus the
//! PIN-gated authorization flow that sits in front of sensitive wallet
//! transactions: session lifecycle, lockout state machine, security
//! audit log, and encrypted backup transport.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod store;
pub mod vault;

pub mod audit;

pub mod authorize;

pub mod records;

pub mod backup;

pub use audit::{
    log_security_event, security_events, SecurityEvent, SecurityEventKind, MAX_EVENTS,
    SECURITY_EVENTS_KEY,
};
pub use authorize::{
    configure_pin, is_pin_configured, GateState, LockoutState, PinGate, SubmitOutcome,
    TransactionRequest, LOCKOUT_KEY, LOCKOUT_MS, MAX_ATTEMPTS, PIN_CREDENTIAL_KEY, PIN_LENGTH,
};
pub use backup::{export_backup, import_backup, BackupPayload, BACKUP_VERSION};
pub use error::VaultError;
pub use records::{
    get_transactions, get_user_data, get_wallet_credentials, store_transactions, store_user_data,
    store_wallet_credentials, TRANSACTIONS_KEY, USER_DATA_KEY, WALLET_CREDENTIALS_KEY,
};
pub use store::{FileStore, MemoryStore, StorageMedium};
pub use vault::{epoch_ms, SecureVault, SessionMarker, StoredRecord, NAMESPACE, SESSION_LIFETIME_MS};
