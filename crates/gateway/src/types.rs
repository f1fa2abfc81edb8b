//! Gateway request and outcome types

use kobopay_core::{AccountNumber, Amount, BankCode, Msisdn, Network};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Provider verdict on a disbursement attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    /// Accepted but not yet settled on the provider side
    Pending,
    Failed,
    /// Provider demands an OTP before completing (transfers)
    OtpRequired,
}

/// What the provider said about one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub status: OutcomeStatus,
    /// Provider-side reference, present once the request was accepted
    pub external_reference: Option<String>,
    /// Provider message, if any
    pub message: Option<String>,
}

impl Outcome {
    pub fn success(external_reference: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Success,
            external_reference: Some(external_reference.into()),
            message: None,
        }
    }

    pub fn pending(message: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Pending,
            external_reference: None,
            message: Some(message.into()),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Failed,
            external_reference: None,
            message: Some(message.into()),
        }
    }

    pub fn otp_required(external_reference: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::OtpRequired,
            external_reference: Some(external_reference.into()),
            message: None,
        }
    }
}

/// Airtime top-up request
#[derive(Debug, Clone)]
pub struct AirtimeRequest {
    pub network: Network,
    pub msisdn: Msisdn,
    pub amount: Amount,
    /// The transaction reference; doubles as the provider idempotency key
    pub request_id: String,
}

/// Data bundle purchase request
#[derive(Debug, Clone)]
pub struct DataRequest {
    pub network: Network,
    pub msisdn: Msisdn,
    pub plan_id: String,
    pub request_id: String,
}

/// Bank transfer initiation request
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub amount: Amount,
    /// The transaction reference; doubles as the provider idempotency key
    pub reference: String,
    pub account_number: AccountNumber,
    pub bank_code: BankCode,
    pub narration: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_constructors() {
        let s = Outcome::success("ext-1");
        assert_eq!(s.status, OutcomeStatus::Success);
        assert_eq!(s.external_reference.as_deref(), Some("ext-1"));

        let f = Outcome::failed("declined");
        assert_eq!(f.status, OutcomeStatus::Failed);
        assert_eq!(f.message.as_deref(), Some("declined"));
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(OutcomeStatus::OtpRequired.to_string(), "otp_required");
        assert_eq!("pending".parse::<OutcomeStatus>().unwrap(), OutcomeStatus::Pending);
    }
}
