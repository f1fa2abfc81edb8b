//! Engine configuration
//!
//! Flow limits, fees and timeouts. `from_env` reads `KOBOPAY_*` variables
//! with the defaults as fallback, so the harness runs unconfigured.

use std::time::Duration;

use kobopay_core::Amount;
use rust_decimal::Decimal;

/// Knobs for the session engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Session TTL; refreshed on every handled message
    pub session_ttl: chrono::Duration,
    pub airtime_min: Amount,
    pub airtime_max: Amount,
    pub transfer_min: Amount,
    pub transfer_max: Amount,
    /// Flat service fee added on top of catalog data-plan prices
    pub data_service_fee: Amount,
    /// Ad-valorem transfer fee, in percent (1.5 = 1.5%)
    pub transfer_fee_percent: Decimal,
    /// Bound on disbursement/OTP gateway calls
    pub disburse_timeout: Duration,
    /// Bound on account-name resolution calls
    pub resolve_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            session_ttl: chrono::Duration::minutes(30),
            airtime_min: Amount::from_naira(50),
            airtime_max: Amount::from_naira(50_000),
            transfer_min: Amount::from_naira(100),
            transfer_max: Amount::from_naira(1_000_000),
            data_service_fee: Amount::from_naira(10),
            transfer_fee_percent: Decimal::new(15, 1), // 1.5%
            disburse_timeout: Duration::from_secs(30),
            resolve_timeout: Duration::from_secs(15),
        }
    }
}

impl EngineConfig {
    /// Build from `KOBOPAY_*` environment variables, falling back to the
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            session_ttl: env_i64("KOBOPAY_SESSION_TTL_MINUTES")
                .map(chrono::Duration::minutes)
                .unwrap_or(defaults.session_ttl),
            airtime_min: env_amount("KOBOPAY_AIRTIME_MIN").unwrap_or(defaults.airtime_min),
            airtime_max: env_amount("KOBOPAY_AIRTIME_MAX").unwrap_or(defaults.airtime_max),
            transfer_min: env_amount("KOBOPAY_TRANSFER_MIN").unwrap_or(defaults.transfer_min),
            transfer_max: env_amount("KOBOPAY_TRANSFER_MAX").unwrap_or(defaults.transfer_max),
            data_service_fee: env_amount("KOBOPAY_DATA_SERVICE_FEE")
                .unwrap_or(defaults.data_service_fee),
            transfer_fee_percent: env_decimal("KOBOPAY_TRANSFER_FEE_PERCENT")
                .unwrap_or(defaults.transfer_fee_percent),
            disburse_timeout: env_i64("KOBOPAY_DISBURSE_TIMEOUT_SECS")
                .map(|s| Duration::from_secs(s.max(1) as u64))
                .unwrap_or(defaults.disburse_timeout),
            resolve_timeout: env_i64("KOBOPAY_RESOLVE_TIMEOUT_SECS")
                .map(|s| Duration::from_secs(s.max(1) as u64))
                .unwrap_or(defaults.resolve_timeout),
        }
    }
}

fn env_i64(key: &str) -> Option<i64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_amount(key: &str) -> Option<Amount> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_decimal(key: &str) -> Option<Decimal> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
