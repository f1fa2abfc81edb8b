//! Transaction record and status state machine

use chrono::{DateTime, Utc};
use kobopay_core::{Amount, UserId};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// What kind of value movement a transaction records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TxnKind {
    Airtime,
    Data,
    BankTransfer,
    Deposit,
    /// Manual credit (admin correction); corrections are new records,
    /// never edits of old ones
    Credit,
}

impl TxnKind {
    /// Short code used in generated references
    pub fn code(&self) -> &'static str {
        match self {
            TxnKind::Airtime => "AIR",
            TxnKind::Data => "DAT",
            TxnKind::BankTransfer => "TRF",
            TxnKind::Deposit => "DEP",
            TxnKind::Credit => "CRD",
        }
    }
}

/// Transaction lifecycle status.
///
/// Transitions are monotone: once terminal, a record never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TxnStatus {
    /// Recorded at confirmation time, before any gateway call
    Pending,
    /// Provider accepted but the outcome is not yet known
    Processing,
    /// Provider demands an OTP before completing (bank transfer only)
    PendingOtp,
    Success,
    Failed,
}

impl TxnStatus {
    /// Whether `self -> target` is a legal transition.
    pub fn can_transition_to(&self, target: TxnStatus) -> bool {
        use TxnStatus::*;
        matches!(
            (self, target),
            (Pending, Processing)
                | (Pending, PendingOtp)
                | (Pending, Success)
                | (Pending, Failed)
                | (Processing, PendingOtp)
                | (Processing, Success)
                | (Processing, Failed)
                | (PendingOtp, Success)
                | (PendingOtp, Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TxnStatus::Success | TxnStatus::Failed)
    }
}

/// One attempted value movement.
///
/// `reference` is assigned exactly once, before the external call, and is
/// the idempotency key for the whole settlement: retries update this record
/// rather than inserting another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub reference: String,
    pub user_id: UserId,
    pub kind: TxnKind,
    pub amount: Amount,
    pub fee: Amount,
    pub total: Amount,
    pub status: TxnStatus,
    /// Provider-side reference, set once the gateway accepts
    pub external_reference: Option<String>,
    /// Human-readable reason, populated on failure or ambiguity
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// A fresh `Pending` record. `total` is amount + fee, computed by the
    /// caller (which already needed it for the affordability check).
    pub fn pending(
        reference: impl Into<String>,
        user_id: UserId,
        kind: TxnKind,
        amount: Amount,
        fee: Amount,
        total: Amount,
    ) -> Self {
        Self {
            reference: reference.into(),
            user_id,
            kind,
            amount,
            fee,
            total,
            status: TxnStatus::Pending,
            external_reference: None,
            reason: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        use TxnStatus::*;
        assert!(Pending.can_transition_to(Success));
        assert!(Pending.can_transition_to(Failed));
        assert!(Pending.can_transition_to(Processing));
        assert!(Pending.can_transition_to(PendingOtp));
        assert!(Processing.can_transition_to(Success));
        assert!(PendingOtp.can_transition_to(Success));
        assert!(PendingOtp.can_transition_to(Failed));
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        use TxnStatus::*;
        for target in [Pending, Processing, PendingOtp, Success, Failed] {
            assert!(!Success.can_transition_to(target));
            assert!(!Failed.can_transition_to(target));
        }
        assert!(Success.is_terminal());
        assert!(Failed.is_terminal());
        assert!(!PendingOtp.is_terminal());
    }

    #[test]
    fn test_no_backwards_transitions() {
        use TxnStatus::*;
        assert!(!Processing.can_transition_to(Pending));
        assert!(!PendingOtp.can_transition_to(Pending));
        assert!(!PendingOtp.can_transition_to(Processing));
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(TxnStatus::PendingOtp.to_string(), "pending_otp");
        assert_eq!("bank_transfer".parse::<TxnKind>().unwrap(), TxnKind::BankTransfer);
    }

    #[test]
    fn test_pending_record_shape() {
        let txn = Transaction::pending(
            "KP-AIR-1234ABCD",
            UserId::from("u-1"),
            TxnKind::Airtime,
            Amount::from_naira(500),
            Amount::ZERO,
            Amount::from_naira(500),
        );
        assert_eq!(txn.status, TxnStatus::Pending);
        assert!(txn.external_reference.is_none());
        assert!(txn.completed_at.is_none());
    }
}
