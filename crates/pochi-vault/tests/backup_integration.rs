#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Backup transport across devices: the bundle moves ciphertext, so a
//! restore onto a vault initialized under a different PIN stays opaque
//! until the original `(user_id, pin)` pair comes back.

use pochi_crypto_core::CryptoError;
use pochi_vault::{export_backup, import_backup, MemoryStore, SecureVault, VaultError};

#[test]
fn restored_bundle_needs_the_original_pin() {
    // Device A.
    let mut source = SecureVault::new(MemoryStore::new()).unwrap();
    source.initialize("u1", "123456").unwrap();
    source.set_secure("balance", &9_000).unwrap();
    let bundle = export_backup(&mut source, "transport-pass").unwrap();

    // Device B, set up under a different PIN. The import succeeds — the
    // transport password checks out — but the inner ciphertext was never
    // re-keyed.
    let mut target = SecureVault::new(MemoryStore::new()).unwrap();
    target.initialize("u1", "999999").unwrap();
    let replayed = import_backup(&mut target, &bundle, "transport-pass").unwrap();
    assert!(replayed >= 1);
    assert!(matches!(
        target.get_secure::<u32>("balance"),
        Err(VaultError::Crypto(CryptoError::Decryption))
    ));

    // Re-initializing with the original credentials unlocks the data.
    target.initialize("u1", "123456").unwrap();
    assert_eq!(target.get_secure::<u32>("balance").unwrap(), Some(9_000));
}

#[test]
fn import_requires_initialized_vault() {
    let mut source = SecureVault::new(MemoryStore::new()).unwrap();
    source.initialize("u1", "123456").unwrap();
    let bundle = export_backup(&mut source, "transport-pass").unwrap();

    let mut target = SecureVault::new(MemoryStore::new()).unwrap();
    assert!(matches!(
        import_backup(&mut target, &bundle, "transport-pass"),
        Err(VaultError::NotInitialized)
    ));
}

#[test]
fn tampered_bundle_is_rejected() {
    let mut source = SecureVault::new(MemoryStore::new()).unwrap();
    source.initialize("u1", "123456").unwrap();
    source.set_secure("balance", &9_000).unwrap();
    let bundle = export_backup(&mut source, "transport-pass").unwrap();

    // Swap one base64 character for a different one.
    let mut chars: Vec<char> = bundle.chars().collect();
    let mid = chars.len() / 2;
    chars[mid] = if chars[mid] == 'A' { 'B' } else { 'A' };
    let tampered: String = chars.into_iter().collect();

    assert!(import_backup(&mut source, &tampered, "transport-pass").is_err());
}
