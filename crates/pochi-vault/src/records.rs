//! Domain record wrappers — field-level selective encryption for wallet
//! data before it reaches the vault.
//!
//! Each wrapper encrypts only the fields an attacker with medium access
//! must not read (PIN, phone, national id, amounts, account numbers, key
//! material) and leaves display fields in the clear inside the record.
//! The whole record is then envelope-encrypted again by `set_secure`, so
//! sensitive fields end up under two layers.
//!
//! Per-field decryption failures are swallowed and warned about, keeping
//! the rest of the record usable — one corrupt field must not take the
//! whole profile down.

use serde_json::{Map, Value};
use tracing::warn;

use pochi_crypto_core::fields;

use crate::error::VaultError;
use crate::store::StorageMedium;
use crate::vault::SecureVault;

/// Record name of the user profile.
pub const USER_DATA_KEY: &str = "user_data";

/// Record name of the transaction history.
pub const TRANSACTIONS_KEY: &str = "transactions";

/// Record name of the wallet credentials.
pub const WALLET_CREDENTIALS_KEY: &str = "wallet_credentials";

/// Profile fields encrypted at the field level.
pub const USER_SENSITIVE_FIELDS: &[&str] = &["pin", "phone", "email", "nationalId"];

/// Transaction fields encrypted at the field level.
pub const TRANSACTION_SENSITIVE_FIELDS: &[&str] = &["amount", "recipientAccount"];

/// Credential fields encrypted at the field level.
pub const CREDENTIAL_SENSITIVE_FIELDS: &[&str] = &["privateKey", "seedPhrase", "accountNumber"];

/// Encrypt a profile's sensitive fields and store it.
///
/// # Errors
///
/// `VaultError::Serialization` unless `user` is a JSON object; otherwise
/// propagates encryption and vault write failures.
pub fn store_user_data<S: StorageMedium>(
    vault: &mut SecureVault<S>,
    user: &Value,
) -> Result<(), VaultError> {
    store_with_fields(vault, USER_DATA_KEY, user, USER_SENSITIVE_FIELDS)
}

/// Fetch and field-decrypt the user profile.
///
/// # Errors
///
/// Propagates vault read failures. Individual field failures are warned
/// about, not propagated.
pub fn get_user_data<S: StorageMedium>(
    vault: &SecureVault<S>,
) -> Result<Option<Value>, VaultError> {
    get_with_fields(vault, USER_DATA_KEY, USER_SENSITIVE_FIELDS)
}

/// Encrypt each transaction's sensitive fields and store the list.
///
/// # Errors
///
/// `VaultError::Serialization` unless every element is a JSON object;
/// otherwise propagates encryption and vault write failures.
pub fn store_transactions<S: StorageMedium>(
    vault: &mut SecureVault<S>,
    transactions: &[Value],
) -> Result<(), VaultError> {
    let key = vault.snapshot_key()?;
    let mut prepared = Vec::with_capacity(transactions.len());
    for tx in transactions {
        let mut record = as_object(tx)?;
        fields::encrypt_fields(&mut record, key.expose(), TRANSACTION_SENSITIVE_FIELDS)?;
        prepared.push(Value::Object(record));
    }
    vault.set_secure(TRANSACTIONS_KEY, &prepared)
}

/// Fetch the transaction list, field-decrypting each entry.
///
/// # Errors
///
/// Propagates vault read failures. Individual field failures are warned
/// about, not propagated.
pub fn get_transactions<S: StorageMedium>(
    vault: &SecureVault<S>,
) -> Result<Vec<Value>, VaultError> {
    let Some(stored) = vault.get_secure::<Vec<Value>>(TRANSACTIONS_KEY)? else {
        return Ok(Vec::new());
    };
    let key = vault.snapshot_key()?;
    let mut restored = Vec::with_capacity(stored.len());
    for tx in stored {
        let mut record = as_object(&tx)?;
        let failed = fields::decrypt_fields(&mut record, key.expose(), TRANSACTION_SENSITIVE_FIELDS);
        for name in failed {
            warn!(record = TRANSACTIONS_KEY, field = %name, "field failed to decrypt — ciphertext preserved");
        }
        restored.push(Value::Object(record));
    }
    Ok(restored)
}

/// Encrypt wallet credentials (key material, account numbers) and store
/// them.
///
/// # Errors
///
/// `VaultError::Serialization` unless `credentials` is a JSON object;
/// otherwise propagates encryption and vault write failures.
pub fn store_wallet_credentials<S: StorageMedium>(
    vault: &mut SecureVault<S>,
    credentials: &Value,
) -> Result<(), VaultError> {
    store_with_fields(
        vault,
        WALLET_CREDENTIALS_KEY,
        credentials,
        CREDENTIAL_SENSITIVE_FIELDS,
    )
}

/// Fetch and field-decrypt the wallet credentials.
///
/// # Errors
///
/// Propagates vault read failures. Individual field failures are warned
/// about, not propagated.
pub fn get_wallet_credentials<S: StorageMedium>(
    vault: &SecureVault<S>,
) -> Result<Option<Value>, VaultError> {
    get_with_fields(vault, WALLET_CREDENTIALS_KEY, CREDENTIAL_SENSITIVE_FIELDS)
}

fn store_with_fields<S: StorageMedium>(
    vault: &mut SecureVault<S>,
    name: &str,
    value: &Value,
    sensitive: &[&str],
) -> Result<(), VaultError> {
    let key = vault.snapshot_key()?;
    let mut record = as_object(value)?;
    fields::encrypt_fields(&mut record, key.expose(), sensitive)?;
    vault.set_secure(name, &Value::Object(record))
}

fn get_with_fields<S: StorageMedium>(
    vault: &SecureVault<S>,
    name: &str,
    sensitive: &[&str],
) -> Result<Option<Value>, VaultError> {
    let Some(stored) = vault.get_secure::<Value>(name)? else {
        return Ok(None);
    };
    let key = vault.snapshot_key()?;
    let mut record = as_object(&stored)?;
    let failed = fields::decrypt_fields(&mut record, key.expose(), sensitive);
    for field in failed {
        warn!(record = name, field = %field, "field failed to decrypt — ciphertext preserved");
    }
    Ok(Some(Value::Object(record)))
}

fn as_object(value: &Value) -> Result<Map<String, Value>, VaultError> {
    value.as_object().cloned().ok_or_else(|| {
        VaultError::Serialization("domain record must be a JSON object".into())
    })
}
