//! KoboPay Accounts - User repository, wallet ledger and PIN guard
//!
//! Storage is behind the [`UserStore`] trait; the engine and the facades in
//! this crate never touch a concrete backend. The in-memory implementation
//! keeps the whole user map behind one async mutex, which is what makes
//! `debit` a single atomic check-and-subtract.

pub mod error;
pub mod pin;
pub mod store;
pub mod wallet;

pub use error::{AccountError, AccountResult};
pub use pin::{PinGuard, PinVerdict, MAX_PIN_FAILURES};
pub use store::{InMemoryUserStore, UserStore};
pub use wallet::WalletLedger;
