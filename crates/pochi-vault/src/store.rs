//! The untrusted persistent key-value medium.
//!
//! Everything written here is assumed readable and writable by anyone
//! with device access — confidentiality and integrity come entirely from
//! the encryption layered on top by [`crate::vault::SecureVault`]. The
//! medium is injected into the vault through a trait seam so tests can
//! substitute an in-memory double.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::VaultError;

/// Plain-text key-value persistence. No encryption happens here.
pub trait StorageMedium {
    /// Read the stored text under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Storage` if the medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, VaultError>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Storage` if the write fails.
    fn put(&mut self, key: &str, value: &str) -> Result<(), VaultError>;

    /// Delete the entry under `key`. Deleting a missing key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Storage` if the removal fails.
    fn remove(&mut self, key: &str) -> Result<(), VaultError>;

    /// All keys currently present, in stable order.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Storage` if the medium cannot be enumerated.
    fn keys(&self) -> Result<Vec<String>, VaultError>;
}

impl<S: StorageMedium + ?Sized> StorageMedium for &mut S {
    fn get(&self, key: &str) -> Result<Option<String>, VaultError> {
        (**self).get(key)
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), VaultError> {
        (**self).put(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), VaultError> {
        (**self).remove(key)
    }

    fn keys(&self) -> Result<Vec<String>, VaultError> {
        (**self).keys()
    }
}

/// In-memory medium for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageMedium for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, VaultError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), VaultError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), VaultError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, VaultError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

/// File-backed medium: one JSON map per wallet, written atomically.
///
/// Mirrors the single-file localStorage shape of the original platform.
/// Writes go through a `.tmp` file and rename so a crash never leaves a
/// half-written map, and the file is owner-only on Unix.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open (or create) the store file at `path`.
    ///
    /// A missing file yields an empty store. A present but unparseable
    /// file is an error — silently discarding a vault would destroy data.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Io` if the file cannot be read and
    /// `VaultError::Storage` if its contents are not a JSON string map.
    pub fn open(path: &Path) -> Result<Self, VaultError> {
        let entries = if path.exists() {
            let contents = fs::read_to_string(path)?;
            serde_json::from_str(&contents)
                .map_err(|e| VaultError::Storage(format!("store file is corrupt: {e}")))?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: path.to_owned(),
            entries,
        })
    }

    fn persist(&self) -> Result<(), VaultError> {
        let json = serde_json::to_string(&self.entries)
            .map_err(|e| VaultError::Storage(format!("store serialization failed: {e}")))?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl StorageMedium for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, VaultError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), VaultError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        self.persist()
    }

    fn remove(&mut self, key: &str) -> Result<(), VaultError> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, VaultError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        store.put("secure_k", "v").unwrap();
        assert_eq!(store.get("secure_k").unwrap().as_deref(), Some("v"));
        assert_eq!(store.keys().unwrap(), vec!["secure_k".to_owned()]);
        store.remove("secure_k").unwrap();
        assert_eq!(store.get("secure_k").unwrap(), None);
    }

    #[test]
    fn memory_store_remove_missing_is_noop() {
        let mut store = MemoryStore::new();
        store.remove("absent").unwrap();
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wallet.json");

        let mut store = FileStore::open(&path).unwrap();
        store.put("secure_a", "1").unwrap();
        store.put("secure_b", "2").unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("secure_a").unwrap().as_deref(), Some("1"));
        assert_eq!(reopened.get("secure_b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn file_store_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(&dir.path().join("absent.json")).unwrap();
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn file_store_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wallet.json");
        fs::write(&path, "{ not valid json").unwrap();
        assert!(matches!(
            FileStore::open(&path),
            Err(VaultError::Storage(_))
        ));
    }

    #[test]
    fn file_store_write_is_atomic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wallet.json");
        let mut store = FileStore::open(&path).unwrap();
        store.put("secure_k", "v").unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wallet.json");
        let mut store = FileStore::open(&path).unwrap();
        store.put("secure_k", "v").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
