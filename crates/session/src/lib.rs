//! KoboPay Session - Multi-step transactional conversation engine
//!
//! One generic step engine drives all three flows (airtime, data, bank
//! transfer): a per-user finite-state machine that collects validated input
//! across turns, gates the final step behind the PIN guard, settles against
//! the wallet and disbursement gateway exactly once, and reconciles the
//! debit with the gateway outcome - including refund on explicit transfer
//! failure.
//!
//! The debit ordering is deliberately asymmetric and must stay that way:
//! transfers debit *before* the gateway call (failure refunds); airtime and
//! data debit *only after* a confirmed success (ambiguous outcomes leave
//! the wallet untouched).

pub mod config;
pub mod engine;
pub mod error;
pub mod flow;
pub mod settle;
pub mod state;

pub use config::EngineConfig;
pub use engine::{EngineDeps, Reply, SessionEngine};
pub use error::{EngineError, EngineResult};
pub use flow::{FlowType, StepKind};
pub use state::{CollectedFields, InMemorySessionStore, Session, SessionStore};
