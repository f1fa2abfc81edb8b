//! User - account profile and verification state
//!
//! Users are created on first interaction with a zero wallet and pending
//! KYC. They are never hard-deleted; `active = false` is the soft
//! deactivation switch.

use crate::amount::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumString};

/// Opaque stable user identifier (the chat platform's id, in practice)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identity-verification state. Flows are gated on `Approved`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, Default,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum KycStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// A KoboPay user account.
///
/// # Invariants
/// - `wallet_balance` never goes negative (enforced by the store's atomic
///   debit)
/// - `pin_failures` resets to 0 on any correct PIN entry
/// - `pin_locked` is set once `pin_failures` reaches the lockout threshold
///   and stays set until an admin unlock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub wallet_balance: Amount,
    pub kyc_status: KycStatus,
    /// Salted PIN digest (`salt$hex`), `None` until the user sets a PIN
    pub pin_hash: Option<String>,
    pub pin_failures: u8,
    pub pin_locked: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a fresh user: zero balance, pending KYC, no PIN.
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            wallet_balance: Amount::ZERO,
            kyc_status: KycStatus::Pending,
            pin_hash: None,
            pin_failures: 0,
            pin_locked: false,
            active: true,
            created_at: Utc::now(),
        }
    }

    /// Whether this user may start a transactional flow at all.
    pub fn can_transact(&self) -> bool {
        self.active && self.kyc_status == KycStatus::Approved
    }

    pub fn has_pin(&self) -> bool {
        self.pin_hash.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_defaults() {
        let user = User::new(UserId::from("u-1"));
        assert!(user.wallet_balance.is_zero());
        assert_eq!(user.kyc_status, KycStatus::Pending);
        assert!(user.pin_hash.is_none());
        assert_eq!(user.pin_failures, 0);
        assert!(!user.pin_locked);
        assert!(user.active);
    }

    #[test]
    fn test_can_transact_requires_approved_kyc() {
        let mut user = User::new(UserId::from("u-1"));
        assert!(!user.can_transact());

        user.kyc_status = KycStatus::Approved;
        assert!(user.can_transact());

        user.active = false;
        assert!(!user.can_transact());
    }

    #[test]
    fn test_kyc_status_strings() {
        assert_eq!("approved".parse::<KycStatus>().unwrap(), KycStatus::Approved);
        assert_eq!(KycStatus::Rejected.to_string(), "rejected");
    }
}
