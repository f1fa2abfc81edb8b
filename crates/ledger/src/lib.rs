//! KoboPay Ledger - Append-only transaction records
//!
//! Every attempted settlement leaves a record keyed by a unique reference
//! (the idempotency key). Records are updated in place as outcomes arrive
//! and never deleted; corrections are new transactions.

pub mod error;
pub mod reference;
pub mod store;
pub mod transaction;

pub use error::{LedgerError, LedgerResult};
pub use reference::new_reference;
pub use store::{InMemoryTransactionStore, TransactionStore};
pub use transaction::{Transaction, TxnKind, TxnStatus};
