//! PIN guard - transaction PIN verification with lockout
//!
//! PINs are stored as a salted SHA-256 digest (`salt$hex`), never in the
//! clear. Three consecutive failures lock the account; only an out-of-band
//! admin unlock clears the lock. A locked or unset PIN rejects verification
//! without consuming an attempt.

use std::sync::Arc;

use kobopay_core::UserId;
use sha2::{Digest, Sha256};

use crate::error::{AccountError, AccountResult};
use crate::store::UserStore;

/// Consecutive failures that trip the lockout
pub const MAX_PIN_FAILURES: u8 = 3;

/// Outcome of a PIN verification attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinVerdict {
    /// PIN matched; the failure counter was reset
    Correct,
    /// PIN did not match; `attempts_remaining` before lockout
    Incorrect { attempts_remaining: u8 },
    /// Account is locked (either already, or by this attempt)
    LockedOut,
    /// No PIN has been set for this user
    NotSet,
}

/// Verifies transaction PINs and enforces the lockout policy.
#[derive(Clone)]
pub struct PinGuard {
    store: Arc<dyn UserStore>,
}

impl PinGuard {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Set (or replace) a user's PIN. The PIN must be exactly 4 digits.
    ///
    /// A locked account cannot change its PIN.
    pub async fn set_pin(&self, id: &UserId, pin: &str) -> AccountResult<()> {
        if !is_well_formed(pin) {
            return Err(AccountError::InvalidPin(
                "PIN must be exactly 4 digits".to_string(),
            ));
        }

        let mut user = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| AccountError::UserNotFound(id.clone()))?;
        if user.pin_locked {
            return Err(AccountError::InvalidPin("Account is locked".to_string()));
        }

        user.pin_hash = Some(encode(pin));
        user.pin_failures = 0;
        self.store.save(user).await
    }

    /// Verify a submitted PIN.
    ///
    /// Locked and unset states are reported without touching the failure
    /// counter. An incorrect attempt that reaches the threshold locks the
    /// account and reports `LockedOut` immediately.
    pub async fn verify(&self, id: &UserId, supplied: &str) -> AccountResult<PinVerdict> {
        let mut user = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| AccountError::UserNotFound(id.clone()))?;

        if user.pin_locked {
            return Ok(PinVerdict::LockedOut);
        }
        let Some(stored) = user.pin_hash.clone() else {
            return Ok(PinVerdict::NotSet);
        };

        if matches(&stored, supplied) {
            if user.pin_failures != 0 {
                user.pin_failures = 0;
                self.store.save(user).await?;
            }
            return Ok(PinVerdict::Correct);
        }

        user.pin_failures = user.pin_failures.saturating_add(1);
        if user.pin_failures >= MAX_PIN_FAILURES {
            user.pin_locked = true;
            tracing::warn!(user = %id, "PIN lockout triggered");
            self.store.save(user).await?;
            return Ok(PinVerdict::LockedOut);
        }

        let attempts_remaining = MAX_PIN_FAILURES - user.pin_failures;
        self.store.save(user).await?;
        Ok(PinVerdict::Incorrect { attempts_remaining })
    }
}

/// Shape check: exactly 4 ASCII digits.
fn is_well_formed(pin: &str) -> bool {
    pin.len() == 4 && pin.bytes().all(|b| b.is_ascii_digit())
}

/// Encode a PIN as `salt$hex(sha256(salt || pin))`.
fn encode(pin: &str) -> String {
    let salt = hex::encode(rand::random::<[u8; 8]>());
    format!("{salt}${}", digest(&salt, pin))
}

/// Compare a submitted PIN against a stored `salt$hex` digest.
fn matches(stored: &str, supplied: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, hash)) => digest(salt, supplied) == hash,
        None => false,
    }
}

fn digest(salt: &str, pin: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(pin.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryUserStore;

    async fn guard_with_user(id: &UserId) -> (PinGuard, Arc<InMemoryUserStore>) {
        let store = Arc::new(InMemoryUserStore::new());
        store.get_or_create(id).await.unwrap();
        (PinGuard::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_verify_without_pin_set() {
        let id = UserId::from("u-1");
        let (guard, _) = guard_with_user(&id).await;

        assert_eq!(guard.verify(&id, "1234").await.unwrap(), PinVerdict::NotSet);
    }

    #[tokio::test]
    async fn test_set_pin_rejects_bad_shapes() {
        let id = UserId::from("u-1");
        let (guard, _) = guard_with_user(&id).await;

        assert!(guard.set_pin(&id, "123").await.is_err());
        assert!(guard.set_pin(&id, "12345").await.is_err());
        assert!(guard.set_pin(&id, "12a4").await.is_err());
        assert!(guard.set_pin(&id, "1234").await.is_ok());
    }

    #[tokio::test]
    async fn test_correct_pin_resets_failures() {
        let id = UserId::from("u-1");
        let (guard, store) = guard_with_user(&id).await;
        guard.set_pin(&id, "1234").await.unwrap();

        assert_eq!(
            guard.verify(&id, "0000").await.unwrap(),
            PinVerdict::Incorrect { attempts_remaining: 2 }
        );
        assert_eq!(
            guard.verify(&id, "1111").await.unwrap(),
            PinVerdict::Incorrect { attempts_remaining: 1 }
        );
        assert_eq!(guard.verify(&id, "1234").await.unwrap(), PinVerdict::Correct);

        let user = store.get(&id).await.unwrap().unwrap();
        assert_eq!(user.pin_failures, 0);
        assert!(!user.pin_locked);
    }

    #[tokio::test]
    async fn test_lockout_after_three_failures() {
        let id = UserId::from("u-1");
        let (guard, store) = guard_with_user(&id).await;
        guard.set_pin(&id, "1234").await.unwrap();

        guard.verify(&id, "0000").await.unwrap();
        guard.verify(&id, "0000").await.unwrap();
        // Third failure trips the lock
        assert_eq!(guard.verify(&id, "0000").await.unwrap(), PinVerdict::LockedOut);

        let user = store.get(&id).await.unwrap().unwrap();
        assert!(user.pin_locked);

        // Even the correct PIN is rejected once locked
        assert_eq!(guard.verify(&id, "1234").await.unwrap(), PinVerdict::LockedOut);
    }

    #[tokio::test]
    async fn test_locked_account_cannot_reset_pin() {
        let id = UserId::from("u-1");
        let (guard, _) = guard_with_user(&id).await;
        guard.set_pin(&id, "1234").await.unwrap();

        for _ in 0..3 {
            guard.verify(&id, "9999").await.unwrap();
        }
        assert!(guard.set_pin(&id, "5678").await.is_err());
    }

    #[test]
    fn test_digest_is_salted() {
        let a = encode("1234");
        let b = encode("1234");
        assert_ne!(a, b); // different salts
        assert!(matches(&a, "1234"));
        assert!(matches(&b, "1234"));
        assert!(!matches(&a, "4321"));
    }
}
