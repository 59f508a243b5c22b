//! Encrypted backup export and import.
//!
//! Export snapshots every namespaced entry's raw stored text — values
//! stay encrypted under the session that wrote them — and seals the
//! bundle under an independent backup password. Restoring replays the
//! raw entries verbatim: the inner ciphertext is *not* re-keyed, so a
//! backup imported under a different PIN stays unreadable until the
//! original `(user_id, pin)` is used again. That trade-off is the
//! design: backups transport ciphertext, they do not re-encrypt it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use pochi_crypto_core::envelope;

use crate::audit::{self, SecurityEventKind};
use crate::error::VaultError;
use crate::store::StorageMedium;
use crate::vault::{epoch_ms, SecureVault};

/// Backup bundle format version.
pub const BACKUP_VERSION: &str = "1.0";

/// The plaintext bundle sealed under the backup password.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupPayload {
    /// Format version tag, checked on import.
    pub version: String,
    /// Export time, epoch milliseconds.
    pub timestamp: u64,
    /// Raw stored text per namespaced storage key.
    pub data: BTreeMap<String, String>,
}

/// Export every namespaced entry into one sealed bundle.
///
/// # Errors
///
/// `VaultError::NotInitialized` without a session; otherwise propagates
/// medium reads and sealing failures.
pub fn export_backup<S: StorageMedium>(
    vault: &mut SecureVault<S>,
    backup_password: &str,
) -> Result<String, VaultError> {
    if !vault.is_initialized() {
        return Err(VaultError::NotInitialized);
    }

    let payload = BackupPayload {
        version: BACKUP_VERSION.to_owned(),
        timestamp: epoch_ms(),
        data: vault.raw_snapshot()?,
    };
    let json = serde_json::to_string(&payload)
        .map_err(|e| VaultError::Serialization(format!("backup serialization failed: {e}")))?;
    let sealed = envelope::seal(json.as_bytes(), backup_password.as_bytes())?;

    audit::log_security_event(
        vault,
        SecurityEventKind::BackupExported,
        serde_json::json!({ "entries": payload.data.len() }),
    )?;
    info!(entries = payload.data.len(), "backup exported");
    Ok(sealed)
}

/// Open a sealed bundle, wipe current storage, and replay its entries.
///
/// Returns the number of entries replayed.
///
/// # Errors
///
/// `VaultError::NotInitialized` without a session;
/// `CryptoError::Decryption` (via `Crypto`) for a wrong backup password;
/// `VaultError::BackupVersion` for an unsupported bundle.
pub fn import_backup<S: StorageMedium>(
    vault: &mut SecureVault<S>,
    sealed: &str,
    backup_password: &str,
) -> Result<usize, VaultError> {
    if !vault.is_initialized() {
        return Err(VaultError::NotInitialized);
    }

    let plain = envelope::open(sealed, backup_password.as_bytes())?;
    let payload: BackupPayload = serde_json::from_slice(plain.expose())
        .map_err(|e| VaultError::Serialization(format!("backup bundle is corrupt: {e}")))?;

    if payload.version != BACKUP_VERSION {
        return Err(VaultError::BackupVersion(payload.version));
    }

    vault.replace_raw(&payload.data)?;

    let replayed = payload.data.len();
    audit::log_security_event(
        vault,
        SecurityEventKind::BackupImported,
        serde_json::json!({ "entries": replayed }),
    )?;
    info!(entries = replayed, "backup imported");
    Ok(replayed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use pochi_crypto_core::CryptoError;

    fn vault() -> SecureVault<MemoryStore> {
        let mut v = SecureVault::new(MemoryStore::new()).unwrap();
        v.initialize("u1", "123456").unwrap();
        v
    }

    #[test]
    fn export_import_roundtrip_same_session() {
        let mut v = vault();
        v.set_secure("balance", &4200).unwrap();
        let bundle = export_backup(&mut v, "backup-pass").unwrap();

        v.set_secure("balance", &0).unwrap();
        v.remove_secure("balance").unwrap();

        let replayed = import_backup(&mut v, &bundle, "backup-pass").unwrap();
        assert!(replayed >= 1);
        assert_eq!(v.get_secure::<u32>("balance").unwrap(), Some(4200));
    }

    #[test]
    fn wrong_backup_password_is_rejected() {
        let mut v = vault();
        let bundle = export_backup(&mut v, "backup-pass").unwrap();
        assert!(matches!(
            import_backup(&mut v, &bundle, "wrong-pass"),
            Err(VaultError::Crypto(CryptoError::Decryption))
        ));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut v = vault();
        let payload = BackupPayload {
            version: "9.9".into(),
            timestamp: epoch_ms(),
            data: BTreeMap::new(),
        };
        let json = serde_json::to_string(&payload).unwrap();
        let sealed = envelope::seal(json.as_bytes(), b"backup-pass").unwrap();

        let err = import_backup(&mut v, &sealed, "backup-pass").expect_err("should fail");
        assert!(matches!(err, VaultError::BackupVersion(v) if v == "9.9"));
    }

    #[test]
    fn import_wipes_entries_not_in_the_bundle() {
        let mut v = vault();
        v.set_secure("keep", &1).unwrap();
        let bundle = export_backup(&mut v, "backup-pass").unwrap();

        v.set_secure("extra", &2).unwrap();
        import_backup(&mut v, &bundle, "backup-pass").unwrap();

        assert_eq!(v.get_secure::<u32>("keep").unwrap(), Some(1));
        assert_eq!(v.get_secure::<u32>("extra").unwrap(), None);
    }

    #[test]
    fn export_requires_initialized_vault() {
        let mut v = SecureVault::new(MemoryStore::new()).unwrap();
        assert!(matches!(
            export_backup(&mut v, "backup-pass"),
            Err(VaultError::NotInitialized)
        ));
    }

    #[test]
    fn bundle_does_not_leak_plaintext() {
        let mut v = vault();
        v.set_secure("phone", "254712345678").unwrap();
        let bundle = export_backup(&mut v, "backup-pass").unwrap();
        assert!(!bundle.contains("254712345678"));
        assert!(!bundle.contains("secure_phone"));
    }
}
