//! PIN verification and lockout — the authorization gate for sensitive
//! transactions.
//!
//! State machine: `Idle → Prompting → Verifying → {Accepted | Rejected}
//! → (Locked)`. Three consecutive wrong PINs engage a 5-minute lockout,
//! persisted through the vault so it survives process restarts; while the
//! window is open every submission is refused without consuming attempts
//! or touching stored ciphertext. The gate never owns a timer — callers
//! poll [`PinGate::poll_lockout`] to drive countdown display, and the
//! lock falls back to `Idle` on its own once the window elapses.
//!
//! All methods take `now_ms` explicitly so the clock stays under the
//! caller's (and the tests') control.

use pochi_crypto_core::pin::{self, PinCredential};
use serde::{Deserialize, Serialize};
use tracing::info;
use zeroize::Zeroize;

use crate::audit::{self, SecurityEventKind};
use crate::error::VaultError;
use crate::store::StorageMedium;
use crate::vault::SecureVault;

/// Required PIN length in digits.
pub const PIN_LENGTH: usize = 6;

/// Consecutive failures before lockout.
pub const MAX_ATTEMPTS: u32 = 3;

/// Lockout window in milliseconds (5 minutes).
pub const LOCKOUT_MS: u64 = 300_000;

/// Record name of the stored PIN credential.
pub const PIN_CREDENTIAL_KEY: &str = "user_pin";

/// Record name of the persisted lockout state.
pub const LOCKOUT_KEY: &str = "pin_lockout";

/// Gate state. `Accepted` and `Rejected` are transient — the gate settles
/// back to `Idle` or `Prompting` within the same call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateState {
    /// No verification in progress.
    Idle,
    /// Waiting for digits.
    Prompting,
    /// Credential check in flight.
    Verifying,
    /// PIN matched; the authorization callback has run.
    Accepted,
    /// PIN did not match.
    Rejected,
    /// Attempt cap reached; submissions refused until the window elapses.
    Locked,
}

/// Persisted lockout window.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockoutState {
    /// Epoch milliseconds at which the window closes and the attempt
    /// counter resets.
    pub until: u64,
}

/// The transaction a caller wants authorized.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    /// Transaction kind — `send`, `withdraw`, `paybill`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Amount in the wallet currency.
    pub amount: f64,
    /// Receiving party, when the kind has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    /// Free-form note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Outcome of one PIN submission.
#[derive(Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// PIN matched; the transaction was authorized.
    Verified,
    /// PIN wrong or malformed; more attempts remain.
    Rejected {
        /// Attempts left before lockout.
        attempts_remaining: u32,
    },
    /// Lockout engaged or already active.
    Locked {
        /// Milliseconds until submissions are accepted again.
        remaining_ms: u64,
    },
}

/// Store a new PIN credential — the settings-flow entry point.
///
/// # Errors
///
/// `VaultError::InvalidPin` unless the PIN is exactly 6 ASCII digits;
/// otherwise propagates hashing and vault write failures.
pub fn configure_pin<S: StorageMedium>(
    vault: &mut SecureVault<S>,
    new_pin: &str,
) -> Result<(), VaultError> {
    if !is_well_formed(new_pin) {
        return Err(VaultError::InvalidPin);
    }
    let credential = pin::hash_pin(new_pin, None)?;
    vault.set_secure(PIN_CREDENTIAL_KEY, &credential)
}

/// `true` if a PIN credential is stored.
///
/// # Errors
///
/// Propagates vault read failures.
pub fn is_pin_configured<S: StorageMedium>(vault: &SecureVault<S>) -> Result<bool, VaultError> {
    Ok(vault.get_secure::<PinCredential>(PIN_CREDENTIAL_KEY)?.is_some())
}

/// One verification flow over a borrowed vault.
pub struct PinGate<'a, S: StorageMedium> {
    vault: &'a mut SecureVault<S>,
    request: TransactionRequest,
    state: GateState,
    attempts: u32,
    digits: String,
    locked_until: Option<u64>,
}

impl<'a, S: StorageMedium> PinGate<'a, S> {
    /// Open the gate for `request`.
    ///
    /// If a persisted lockout window is still open the gate starts in
    /// `Locked`; an expired window is cleaned up and the gate starts in
    /// `Prompting`.
    ///
    /// # Errors
    ///
    /// Propagates vault read/write failures.
    pub fn begin(
        vault: &'a mut SecureVault<S>,
        request: TransactionRequest,
        now_ms: u64,
    ) -> Result<Self, VaultError> {
        let lockout: Option<LockoutState> = vault.get_secure(LOCKOUT_KEY)?;
        let (state, locked_until) = match lockout {
            Some(lock) if lock.until > now_ms => (GateState::Locked, Some(lock.until)),
            Some(_) => {
                vault.remove_secure(LOCKOUT_KEY)?;
                (GateState::Prompting, None)
            }
            None => (GateState::Prompting, None),
        };
        Ok(Self {
            vault,
            request,
            state,
            attempts: 0,
            digits: String::new(),
            locked_until,
        })
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> GateState {
        self.state
    }

    /// Failed attempts so far in this flow.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Remaining lockout time, or `None` when not locked.
    ///
    /// Drives the caller's countdown display. When the window has
    /// elapsed this clears the persisted lockout, resets the attempt
    /// counter, and settles back to `Idle`.
    ///
    /// # Errors
    ///
    /// Propagates vault write failures while clearing an expired lockout.
    pub fn poll_lockout(&mut self, now_ms: u64) -> Result<Option<u64>, VaultError> {
        let Some(until) = self.locked_until else {
            return Ok(None);
        };
        if now_ms < until {
            return Ok(Some(until.saturating_sub(now_ms)));
        }
        self.vault.remove_secure(LOCKOUT_KEY)?;
        self.locked_until = None;
        self.attempts = 0;
        self.state = GateState::Idle;
        Ok(None)
    }

    /// Collect one digit; fires verification automatically once 6 are
    /// held (no explicit confirm step). Non-digit input is ignored.
    ///
    /// # Errors
    ///
    /// Propagates [`submit`](Self::submit) failures.
    pub fn push_digit<F: FnOnce(&str)>(
        &mut self,
        digit: char,
        now_ms: u64,
        on_verified: F,
    ) -> Result<Option<SubmitOutcome>, VaultError> {
        if !digit.is_ascii_digit() {
            return Ok(None);
        }
        self.digits.push(digit);
        if self.digits.len() < PIN_LENGTH {
            return Ok(None);
        }
        let mut entered = std::mem::take(&mut self.digits);
        let outcome = self.submit(&entered, now_ms, on_verified);
        entered.zeroize();
        outcome.map(Some)
    }

    /// Verify `candidate` against the stored credential.
    ///
    /// - active lockout → `Locked`, no attempt consumed
    /// - malformed PIN (length ≠ 6 or non-digits) → `Rejected`, no
    ///   attempt consumed
    /// - match → `transaction_verified` audit event, the authorization
    ///   callback runs with the confirmed PIN, counter resets
    /// - mismatch → counter up; at 3 the lockout is persisted, a
    ///   `pin_locked` event logged, and the gate locks
    ///
    /// # Errors
    ///
    /// `VaultError::PinNotConfigured` when no credential is stored —
    /// deliberately distinct from a wrong PIN. Otherwise propagates
    /// vault and crypto failures.
    pub fn submit<F: FnOnce(&str)>(
        &mut self,
        candidate: &str,
        now_ms: u64,
        on_verified: F,
    ) -> Result<SubmitOutcome, VaultError> {
        if let Some(remaining_ms) = self.poll_lockout(now_ms)? {
            return Ok(SubmitOutcome::Locked { remaining_ms });
        }

        if !is_well_formed(candidate) {
            self.state = GateState::Prompting;
            return Ok(SubmitOutcome::Rejected {
                attempts_remaining: MAX_ATTEMPTS.saturating_sub(self.attempts),
            });
        }

        self.state = GateState::Verifying;
        let Some(credential) = self
            .vault
            .get_secure::<PinCredential>(PIN_CREDENTIAL_KEY)?
        else {
            self.state = GateState::Idle;
            return Err(VaultError::PinNotConfigured);
        };

        if pin::verify_pin(candidate, &credential.hash, &credential.salt)? {
            self.state = GateState::Accepted;
            let details = serde_json::json!({
                "kind": self.request.kind,
                "amount": self.request.amount,
            });
            audit::log_security_event(
                self.vault,
                SecurityEventKind::TransactionVerified,
                details,
            )?;
            on_verified(candidate);
            self.attempts = 0;
            self.state = GateState::Idle;
            return Ok(SubmitOutcome::Verified);
        }

        self.state = GateState::Rejected;
        self.attempts = self.attempts.saturating_add(1);
        audit::log_security_event(
            self.vault,
            SecurityEventKind::PinFailed,
            serde_json::json!({ "attempt": self.attempts }),
        )?;

        if self.attempts >= MAX_ATTEMPTS {
            let until = now_ms.saturating_add(LOCKOUT_MS);
            self.vault.set_secure(LOCKOUT_KEY, &LockoutState { until })?;
            audit::log_security_event(
                self.vault,
                SecurityEventKind::PinLocked,
                serde_json::json!({ "untilMs": until }),
            )?;
            info!(until_ms = until, "PIN verification locked");
            self.locked_until = Some(until);
            self.state = GateState::Locked;
            return Ok(SubmitOutcome::Locked {
                remaining_ms: LOCKOUT_MS,
            });
        }

        self.state = GateState::Prompting;
        Ok(SubmitOutcome::Rejected {
            attempts_remaining: MAX_ATTEMPTS.saturating_sub(self.attempts),
        })
    }
}

fn is_well_formed(candidate: &str) -> bool {
    candidate.len() == PIN_LENGTH && candidate.chars().all(|c| c.is_ascii_digit())
}
