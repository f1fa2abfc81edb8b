//! Engine errors
//!
//! Only genuinely unexpected conditions surface as `EngineError` - storage
//! faults and broken internal invariants. Everything user-recoverable
//! (validation, insufficient funds, wrong PIN, unresolvable account,
//! expiry) is handled inside the engine and rendered into a [`Reply`];
//! gateway failures are converted into ledger entries at the settlement
//! boundary and never escape it.
//!
//! [`Reply`]: crate::engine::Reply

use kobopay_accounts::AccountError;
use kobopay_ledger::LedgerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Account error: {0}")]
    Account(#[from] AccountError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("Engine invariant violated: {0}")]
    Internal(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
