//! Beneficiary account-name resolution

use async_trait::async_trait;
use kobopay_core::{AccountNumber, BankCode};
use serde::{Deserialize, Serialize};

use crate::error::GatewayResult;

/// A resolved beneficiary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub account_name: String,
    pub bank_name: String,
}

/// Looks up the account name behind a (number, bank) pair.
///
/// `Ok(None)` means the pair could not be resolved - a recoverable
/// condition; callers fall back to manual name entry rather than blocking
/// the flow. Transport errors are treated the same way.
#[async_trait]
pub trait AccountResolver: Send + Sync {
    async fn resolve(
        &self,
        account_number: &AccountNumber,
        bank_code: &BankCode,
    ) -> GatewayResult<Option<Resolution>>;
}
