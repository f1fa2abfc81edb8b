//! Account errors

use kobopay_core::{Amount, UserId};
use thiserror::Error;

/// Errors from user storage and wallet operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Amount, requested: Amount },

    #[error("Invalid PIN: {0}")]
    InvalidPin(String),

    #[error("Balance overflow")]
    BalanceOverflow,

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type AccountResult<T> = Result<T, AccountError>;
