//! Selective field-level encryption over JSON objects.
//!
//! Only named fields of a record are replaced with their sealed form;
//! absent or null fields are left untouched. Decryption is deliberately
//! lenient: one field failing to decrypt does not abort the rest of the
//! object — the ciphertext value is preserved and the field name reported
//! back so the caller can log it. Availability over strictness.

use crate::envelope;
use crate::error::CryptoError;
use serde_json::{Map, Value};

/// Encrypt the named fields of a JSON object in place.
///
/// Each present, non-null field is serialized to its JSON text form and
/// replaced by a base64 envelope string. Fields not listed, absent, or
/// null are untouched.
///
/// # Errors
///
/// Returns the first serialization or encryption error — unlike
/// decryption, a partial *write* of sensitive data is never acceptable.
pub fn encrypt_fields(
    record: &mut Map<String, Value>,
    password: &[u8],
    field_names: &[&str],
) -> Result<(), CryptoError> {
    for &name in field_names {
        let Some(value) = record.get(name) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        let plain = serde_json::to_string(value)
            .map_err(|e| CryptoError::Encryption(format!("field serialization failed: {e}")))?;
        let sealed = envelope::seal(plain.as_bytes(), password)?;
        record.insert(name.to_owned(), Value::String(sealed));
    }
    Ok(())
}

/// Decrypt the named fields of a JSON object in place.
///
/// Returns the names of fields that failed to decrypt or re-parse; those
/// keep their stored ciphertext value so the rest of the record stays
/// usable. Fields not listed, absent, null, or non-string are skipped.
#[must_use]
pub fn decrypt_fields(
    record: &mut Map<String, Value>,
    password: &[u8],
    field_names: &[&str],
) -> Vec<String> {
    let mut failed = Vec::new();
    for &name in field_names {
        let Some(Value::String(encoded)) = record.get(name) else {
            continue;
        };
        let restored = envelope::open(encoded, password)
            .ok()
            .and_then(|plain| serde_json::from_slice::<Value>(plain.expose()).ok());
        match restored {
            Some(value) => {
                record.insert(name.to_owned(), value);
            }
            None => failed.push(name.to_owned()),
        }
    }
    failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PASSWORD: &[u8] = b"field-password";

    fn profile() -> Map<String, Value> {
        json!({
            "name": "Wanjiku",
            "phone": "254712345678",
            "email": "wanjiku@example.com",
            "balance": 1500,
            "memo": null,
        })
        .as_object()
        .expect("object literal")
        .clone()
    }

    #[test]
    fn named_fields_are_replaced_with_envelopes() {
        let mut record = profile();
        encrypt_fields(&mut record, PASSWORD, &["phone", "email"])
            .expect("encrypt should succeed");
        assert_ne!(record["phone"], json!("254712345678"));
        assert_ne!(record["email"], json!("wanjiku@example.com"));
        // Unlisted fields stay in the clear.
        assert_eq!(record["name"], json!("Wanjiku"));
        assert_eq!(record["balance"], json!(1500));
    }

    #[test]
    fn null_and_absent_fields_are_skipped() {
        let mut record = profile();
        encrypt_fields(&mut record, PASSWORD, &["memo", "national_id"])
            .expect("encrypt should succeed");
        assert_eq!(record["memo"], Value::Null);
        assert!(!record.contains_key("national_id"));
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let mut record = profile();
        encrypt_fields(&mut record, PASSWORD, &["phone", "email", "balance"])
            .expect("encrypt should succeed");
        let failed = decrypt_fields(&mut record, PASSWORD, &["phone", "email", "balance"]);
        assert!(failed.is_empty());
        assert_eq!(record["phone"], json!("254712345678"));
        assert_eq!(record["email"], json!("wanjiku@example.com"));
        assert_eq!(record["balance"], json!(1500));
    }

    #[test]
    fn one_bad_field_does_not_abort_the_rest() {
        let mut record = profile();
        encrypt_fields(&mut record, PASSWORD, &["phone", "email"])
            .expect("encrypt should succeed");
        // Corrupt one sealed field.
        let corrupted = Value::String("not-an-envelope".into());
        let original_email = record["email"].clone();
        record.insert("email".into(), corrupted.clone());

        let failed = decrypt_fields(&mut record, PASSWORD, &["phone", "email"]);
        assert_eq!(failed, vec!["email".to_owned()]);
        // The good field decrypted, the bad one kept its stored value.
        assert_eq!(record["phone"], json!("254712345678"));
        assert_eq!(record["email"], corrupted);
        assert_ne!(record["email"], original_email);
    }

    #[test]
    fn wrong_password_preserves_ciphertext() {
        let mut record = profile();
        encrypt_fields(&mut record, PASSWORD, &["phone"]).expect("encrypt should succeed");
        let sealed = record["phone"].clone();

        let failed = decrypt_fields(&mut record, b"wrong-password", &["phone"]);
        assert_eq!(failed, vec!["phone".to_owned()]);
        assert_eq!(record["phone"], sealed);
    }

    #[test]
    fn non_string_fields_are_not_decrypted() {
        let mut record = profile();
        let failed = decrypt_fields(&mut record, PASSWORD, &["balance"]);
        assert!(failed.is_empty());
        assert_eq!(record["balance"], json!(1500));
    }
}
