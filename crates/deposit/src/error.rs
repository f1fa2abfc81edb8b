//! Deposit errors

use kobopay_accounts::AccountError;
use kobopay_ledger::LedgerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DepositError {
    #[error("Account error: {0}")]
    Account(#[from] AccountError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Virtual account provisioning failed: {0}")]
    Provisioning(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type DepositResult<T> = Result<T, DepositError>;
