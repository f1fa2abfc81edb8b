//! KoboPay Gateway - External collaborator interfaces
//!
//! Abstract capabilities the core needs from the outside world:
//! disbursement (airtime, data, bank transfer), account-name resolution,
//! the data-plan catalog, and user notification. Concrete HTTP adapters
//! live outside this workspace; the [`sandbox`] module ships a
//! deterministic in-process provider for the CLI harness and tests.

pub mod auth;
pub mod catalog;
pub mod disbursement;
pub mod error;
pub mod notify;
pub mod resolve;
pub mod sandbox;
pub mod types;

pub use auth::TokenCache;
pub use catalog::{DataPlan, PlanCatalog, StaticCatalog, Validity};
pub use disbursement::DisbursementGateway;
pub use error::{GatewayError, GatewayResult};
pub use notify::{Notifier, TracingNotifier};
pub use resolve::{AccountResolver, Resolution};
pub use sandbox::{SandboxGateway, SandboxResolver, SANDBOX_OTP};
pub use types::{AirtimeRequest, DataRequest, Outcome, OutcomeStatus, TransferRequest};
