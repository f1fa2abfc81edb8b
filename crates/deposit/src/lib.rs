//! KoboPay Deposit - funding the wallet by bank transfer
//!
//! Each user gets one provider-issued virtual account number; incoming
//! payments arrive as webhooks carrying the destination account number and
//! a provider reference. Intake is idempotent on that reference: a webhook
//! delivered twice credits exactly once.

pub mod error;
pub mod virtual_account;
pub mod webhook;

pub use error::{DepositError, DepositResult};
pub use virtual_account::{
    InMemoryVirtualAccountStore, SandboxAccountProvider, VirtualAccount, VirtualAccountProvider,
    VirtualAccountStore, VirtualAccounts,
};
pub use webhook::{DepositOutcome, DepositProcessor, WebhookEvent};
