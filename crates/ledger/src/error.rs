//! Ledger errors

use crate::transaction::TxnStatus;
use thiserror::Error;

/// Errors from transaction storage
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Duplicate transaction reference: {0}")]
    DuplicateReference(String),

    #[error("Transaction not found: {0}")]
    NotFound(String),

    #[error("Invalid status transition for {reference}: {from} -> {to}")]
    InvalidTransition {
        reference: String,
        from: TxnStatus,
        to: TxnStatus,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
