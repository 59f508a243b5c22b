//! The secure vault — encrypted named records over an untrusted medium.
//!
//! The vault is the only component that touches the persistent key-value
//! medium for sensitive data. It owns the in-memory session state: a
//! random per-process session token and the storage key derived from
//! `(user_id, pin)` at [`SecureVault::initialize`]. The key is derived,
//! never stored — losing the PIN makes prior records permanently
//! unrecoverable, and that is the design.
//!
//! Every record is sealed through the password-keyed envelope with the
//! session key as the password, so each write gets a fresh salt and nonce
//! and the stored bytes are useless without re-deriving the key.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use data_encoding::HEXLOWER;
use pochi_crypto_core::kdf::{self, KeyPurpose};
use pochi_crypto_core::memory::SecretBytes;
use pochi_crypto_core::{envelope, CryptoError};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;
use zeroize::Zeroize;

use crate::audit::{self, SecurityEventKind};
use crate::error::VaultError;
use crate::store::StorageMedium;

/// Prefix namespacing every vault entry in the shared medium.
pub const NAMESPACE: &str = "secure_";

/// Record name of the session marker.
pub(crate) const SESSION_MARKER_KEY: &str = "vault_session";

/// Absolute session lifetime — markers older than this are wiped.
pub const SESSION_LIFETIME_MS: u64 = 24 * 60 * 60 * 1000;

/// Current time as milliseconds since the Unix epoch.
#[must_use]
pub fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

/// On-medium shape of one vault entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    /// Base64 envelope of the serialized value.
    pub data: String,
    /// Write time, epoch milliseconds.
    pub timestamp: u64,
    /// Token of the session that wrote the record.
    pub session_token: String,
}

/// Session marker persisted at initialization, checked by
/// [`SecureVault::validate_integrity`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMarker {
    /// Owner of the session.
    pub user_id: String,
    /// Initialization time, epoch milliseconds.
    pub timestamp: u64,
    /// Token of the initializing process session.
    pub session_token: String,
}

/// Encrypted keyed store over an injected [`StorageMedium`].
pub struct SecureVault<S: StorageMedium> {
    store: S,
    session_token: String,
    session_key: Option<SecretBytes<32>>,
    user_id: Option<String>,
}

impl<S: StorageMedium> std::fmt::Debug for SecureVault<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecureVault(***)")
    }
}

impl<S: StorageMedium> SecureVault<S> {
    /// Wrap a storage medium. The vault starts uninitialized with a fresh
    /// random session token.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Crypto` if the CSPRNG fails.
    pub fn new(store: S) -> Result<Self, VaultError> {
        let mut token_bytes = [0u8; 16];
        OsRng.try_fill_bytes(&mut token_bytes).map_err(|e| {
            VaultError::Crypto(CryptoError::SecureMemory(format!(
                "CSPRNG fill failed: {e}"
            )))
        })?;
        Ok(Self {
            store,
            session_token: HEXLOWER.encode(&token_bytes),
            session_key: None,
            user_id: None,
        })
    }

    /// Derive the session storage key from `(user_id, pin)` and persist a
    /// session marker. Must be called before any other vault operation;
    /// calling it again simply replaces the in-memory key.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Crypto` if derivation fails or
    /// `VaultError::Storage` if the marker cannot be written.
    pub fn initialize(&mut self, user_id: &str, pin: &str) -> Result<(), VaultError> {
        let key = kdf::derive_wallet_key(user_id, pin, KeyPurpose::Storage)?;
        self.session_key = Some(key);
        self.user_id = Some(user_id.to_owned());

        let marker = SessionMarker {
            user_id: user_id.to_owned(),
            timestamp: epoch_ms(),
            session_token: self.session_token.clone(),
        };
        self.set_secure(SESSION_MARKER_KEY, &marker)?;

        audit::log_security_event(
            self,
            SecurityEventKind::VaultInitialized,
            serde_json::json!({ "userId": user_id }),
        )?;
        Ok(())
    }

    /// `true` while a derived session key is held in memory.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.session_key.is_some()
    }

    /// The live process session token (hex).
    #[must_use]
    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    /// Encrypt and store `value` under the namespaced `name`.
    ///
    /// # Errors
    ///
    /// `VaultError::NotInitialized` without a session key;
    /// `VaultError::Serialization` / `Storage` / `Crypto` otherwise.
    pub fn set_secure<T: Serialize + ?Sized>(
        &mut self,
        name: &str,
        value: &T,
    ) -> Result<(), VaultError> {
        // Snapshot the key up front — the medium write below must not
        // observe a session change mid-operation.
        let key = self.snapshot_key()?;

        let json = serde_json::to_string(value)
            .map_err(|e| VaultError::Serialization(format!("record serialization failed: {e}")))?;
        let sealed = envelope::seal(json.as_bytes(), key.expose())?;

        let record = StoredRecord {
            data: sealed,
            timestamp: epoch_ms(),
            session_token: self.session_token.clone(),
        };
        let text = serde_json::to_string(&record)
            .map_err(|e| VaultError::Serialization(format!("record serialization failed: {e}")))?;

        self.store.put(&storage_key(name), &text)
    }

    /// Fetch and decrypt the record under `name`; `None` if absent.
    ///
    /// A record written by a different session token is still returned as
    /// long as the current key decrypts it — the token mismatch is only
    /// warned about, since the key is what decides decryptability.
    ///
    /// # Errors
    ///
    /// `VaultError::NotInitialized` without a session key;
    /// `CryptoError::Decryption` (via `Crypto`) when the current key does
    /// not match the writing key — never silently corrupted data.
    pub fn get_secure<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, VaultError> {
        let key = self.snapshot_key()?;

        let Some(text) = self.store.get(&storage_key(name))? else {
            return Ok(None);
        };
        let record: StoredRecord = serde_json::from_str(&text)
            .map_err(|e| VaultError::Serialization(format!("record is corrupt: {e}")))?;

        if record.session_token != self.session_token {
            warn!(record = name, "record written by a previous session");
        }

        let plain = envelope::open(&record.data, key.expose())?;
        let value = serde_json::from_slice(plain.expose())
            .map_err(|e| VaultError::Serialization(format!("record payload is corrupt: {e}")))?;
        Ok(Some(value))
    }

    /// Delete the record under `name`.
    ///
    /// # Errors
    ///
    /// `VaultError::NotInitialized` without a session key;
    /// `VaultError::Storage` if the removal fails.
    pub fn remove_secure(&mut self, name: &str) -> Result<(), VaultError> {
        if !self.is_initialized() {
            return Err(VaultError::NotInitialized);
        }
        self.store.remove(&storage_key(name))
    }

    /// Drop the in-memory session key. Data stays on the medium but is
    /// unreadable until [`initialize`](Self::initialize) re-derives the
    /// same key from the same `(user_id, pin)`.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Storage` if the audit write fails.
    pub fn clear_session(&mut self) -> Result<(), VaultError> {
        if self.is_initialized() {
            // Log while the key is still available to encrypt the event.
            audit::log_security_event(
                self,
                SecurityEventKind::SessionCleared,
                serde_json::Value::Null,
            )?;
        }
        self.session_key = None;
        self.user_id = None;
        Ok(())
    }

    /// Wipe every namespaced entry from the medium and drop the session.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Storage` if the medium cannot be enumerated
    /// or an entry cannot be removed.
    pub fn clear_all_secure_storage(&mut self) -> Result<(), VaultError> {
        for key in self.namespaced_keys()? {
            self.store.remove(&key)?;
        }
        self.session_key = None;
        self.user_id = None;
        Ok(())
    }

    /// Check the persisted session marker against the live session.
    ///
    /// Returns `false` — after wiping all storage — when the marker is
    /// missing, older than 24 hours, or carries a token that does not
    /// match the live process session.
    ///
    /// # Errors
    ///
    /// `VaultError::NotInitialized` without a session key;
    /// `VaultError::Storage` if the medium fails.
    pub fn validate_integrity(&mut self) -> Result<bool, VaultError> {
        let marker: Option<SessionMarker> = match self.get_secure(SESSION_MARKER_KEY) {
            Ok(marker) => marker,
            Err(VaultError::Crypto(CryptoError::Decryption)) => None,
            Err(e) => return Err(e),
        };

        let valid = marker.is_some_and(|m| {
            let age = epoch_ms().saturating_sub(m.timestamp);
            age <= SESSION_LIFETIME_MS && m.session_token == self.session_token
        });

        if !valid {
            warn!("session marker invalid or expired — wiping secure storage");
            self.clear_all_secure_storage()?;
        }
        Ok(valid)
    }

    /// Snapshot the session key for one operation.
    ///
    /// # Errors
    ///
    /// `VaultError::NotInitialized` without a session key.
    pub(crate) fn snapshot_key(&self) -> Result<SecretBytes<32>, VaultError> {
        let key = self.session_key.as_ref().ok_or(VaultError::NotInitialized)?;
        let mut copy = [0u8; 32];
        copy.copy_from_slice(key.expose());
        let snapshot = SecretBytes::new(copy);
        copy.zeroize();
        Ok(snapshot)
    }

    /// All namespaced storage keys currently on the medium.
    pub(crate) fn namespaced_keys(&self) -> Result<Vec<String>, VaultError> {
        Ok(self
            .store
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(NAMESPACE))
            .collect())
    }

    /// Raw stored text of every namespaced entry, keyed by storage key.
    /// Used by backup export — values stay encrypted.
    pub(crate) fn raw_snapshot(&self) -> Result<BTreeMap<String, String>, VaultError> {
        let mut snapshot = BTreeMap::new();
        for key in self.namespaced_keys()? {
            if let Some(text) = self.store.get(&key)? {
                snapshot.insert(key, text);
            }
        }
        Ok(snapshot)
    }

    /// Replace all namespaced entries with `entries`, verbatim. Used by
    /// backup import — the in-memory session is left untouched.
    pub(crate) fn replace_raw(
        &mut self,
        entries: &BTreeMap<String, String>,
    ) -> Result<(), VaultError> {
        for key in self.namespaced_keys()? {
            self.store.remove(&key)?;
        }
        for (key, text) in entries {
            if key.starts_with(NAMESPACE) {
                self.store.put(key, text)?;
            }
        }
        Ok(())
    }
}

fn storage_key(name: &str) -> String {
    format!("{NAMESPACE}{name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn vault() -> SecureVault<MemoryStore> {
        SecureVault::new(MemoryStore::new()).expect("vault construction should succeed")
    }

    #[test]
    fn operations_fail_before_initialize() {
        let mut v = vault();
        assert!(!v.is_initialized());
        assert!(matches!(
            v.set_secure("k", "v"),
            Err(VaultError::NotInitialized)
        ));
        assert!(matches!(
            v.get_secure::<String>("k"),
            Err(VaultError::NotInitialized)
        ));
        assert!(matches!(
            v.remove_secure("k"),
            Err(VaultError::NotInitialized)
        ));
    }

    #[test]
    fn set_get_roundtrip() {
        let mut v = vault();
        v.initialize("u1", "123456").unwrap();
        v.set_secure("k", "v").unwrap();
        assert_eq!(v.get_secure::<String>("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn get_absent_is_none() {
        let mut v = vault();
        v.initialize("u1", "123456").unwrap();
        assert_eq!(v.get_secure::<String>("absent").unwrap(), None);
    }

    #[test]
    fn remove_deletes_record() {
        let mut v = vault();
        v.initialize("u1", "123456").unwrap();
        v.set_secure("k", "v").unwrap();
        v.remove_secure("k").unwrap();
        assert_eq!(v.get_secure::<String>("k").unwrap(), None);
    }

    #[test]
    fn clear_session_blocks_access_until_reinitialize() {
        let mut v = vault();
        v.initialize("u1", "123456").unwrap();
        v.set_secure("k", "v").unwrap();

        v.clear_session().unwrap();
        assert!(!v.is_initialized());
        assert!(matches!(
            v.get_secure::<String>("k"),
            Err(VaultError::NotInitialized)
        ));

        // Same (user_id, pin) → same derived key → data readable again.
        v.initialize("u1", "123456").unwrap();
        assert_eq!(v.get_secure::<String>("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn different_pin_fails_to_decrypt() {
        let mut v = vault();
        v.initialize("u1", "123456").unwrap();
        v.set_secure("k", "v").unwrap();

        v.initialize("u1", "654321").unwrap();
        assert!(matches!(
            v.get_secure::<String>("k"),
            Err(VaultError::Crypto(CryptoError::Decryption))
        ));
    }

    #[test]
    fn stored_record_is_namespaced_and_opaque() {
        let mut store = MemoryStore::new();
        {
            let mut v = SecureVault::new(&mut store).unwrap();
            v.initialize("u1", "123456").unwrap();
            v.set_secure("k", "plain-value").unwrap();
        }
        let raw = store.get("secure_k").unwrap().expect("record should exist");
        assert!(!raw.contains("plain-value"));
        let record: StoredRecord = serde_json::from_str(&raw).unwrap();
        assert!(!record.data.contains("plain-value"));
    }

    #[test]
    fn clear_all_wipes_namespaced_entries() {
        let mut v = vault();
        v.initialize("u1", "123456").unwrap();
        v.set_secure("a", "1").unwrap();
        v.set_secure("b", "2").unwrap();
        v.clear_all_secure_storage().unwrap();

        assert!(!v.is_initialized());
        v.initialize("u1", "123456").unwrap();
        assert_eq!(v.get_secure::<String>("a").unwrap(), None);
        assert_eq!(v.get_secure::<String>("b").unwrap(), None);
    }

    #[test]
    fn validate_integrity_accepts_fresh_session() {
        let mut v = vault();
        v.initialize("u1", "123456").unwrap();
        assert!(v.validate_integrity().unwrap());
    }

    #[test]
    fn validate_integrity_wipes_expired_session() {
        let mut v = vault();
        v.initialize("u1", "123456").unwrap();
        v.set_secure("k", "v").unwrap();

        // Rewrite the marker with a timestamp past the 24-hour lifetime.
        let stale = SessionMarker {
            user_id: "u1".into(),
            timestamp: epoch_ms() - SESSION_LIFETIME_MS - 1,
            session_token: v.session_token().to_owned(),
        };
        v.set_secure(SESSION_MARKER_KEY, &stale).unwrap();

        assert!(!v.validate_integrity().unwrap());
        v.initialize("u1", "123456").unwrap();
        assert_eq!(v.get_secure::<String>("k").unwrap(), None);
    }

    #[test]
    fn validate_integrity_wipes_on_token_mismatch() {
        let mut v = vault();
        v.initialize("u1", "123456").unwrap();

        let foreign = SessionMarker {
            user_id: "u1".into(),
            timestamp: epoch_ms(),
            session_token: "deadbeefdeadbeefdeadbeefdeadbeef".into(),
        };
        v.set_secure(SESSION_MARKER_KEY, &foreign).unwrap();

        assert!(!v.validate_integrity().unwrap());
    }

    #[test]
    fn validate_integrity_wipes_on_missing_marker() {
        let mut v = vault();
        v.initialize("u1", "123456").unwrap();
        v.remove_secure(SESSION_MARKER_KEY).unwrap();
        assert!(!v.validate_integrity().unwrap());
    }

    #[test]
    fn session_tokens_are_unique_per_vault() {
        let a = vault();
        let b = vault();
        assert_ne!(a.session_token(), b.session_token());
        assert_eq!(a.session_token().len(), 32);
    }

    #[test]
    fn reinitialize_replaces_key_in_place() {
        let mut v = vault();
        v.initialize("u1", "123456").unwrap();
        v.initialize("u1", "123456").unwrap();
        assert!(v.is_initialized());
    }
}
