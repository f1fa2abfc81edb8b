//! Gateway errors
//!
//! A gateway `Err` is indeterminate from the caller's point of view: the
//! settlement layer converts it into a ledger entry, never lets it escape.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Provider call timed out")]
    Timeout,

    #[error("Provider transport error: {0}")]
    Transport(String),

    #[error("Gateway misconfigured: {0}")]
    Configuration(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;
