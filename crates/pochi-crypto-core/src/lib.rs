//! `pochi-crypto-core` — Pure cryptographic primitives for POCHI.
//!
//! This crate is the audit target: zero storage, zero network, zero async.
//! Everything here is a deterministic function over explicit inputs plus
//! the OS CSPRNG for salts, nonces, and tokens.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod memory;

pub mod kdf;
pub mod pin;

pub mod symmetric;

pub mod envelope;

pub mod fields;

pub use envelope::{open, seal, NONCE_OFFSET, PAYLOAD_OFFSET, SALT_LEN};
pub use error::CryptoError;
pub use fields::{decrypt_fields, encrypt_fields};
pub use kdf::{derive, derive_wallet_key, KeyPurpose, DEFAULT_ITERATIONS, KEY_LEN};
pub use memory::{SecretBuffer, SecretBytes};
pub use pin::{hash_pin, verify_pin, PinCredential};
pub use symmetric::{decrypt, encrypt, SealedData, NONCE_LEN, TAG_LEN};
