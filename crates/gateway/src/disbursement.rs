//! Disbursement gateway trait

use async_trait::async_trait;

use crate::error::GatewayResult;
use crate::types::{AirtimeRequest, DataRequest, Outcome, TransferRequest};

/// The external provider that actually delivers airtime/data or moves bank
/// funds.
///
/// All operations carry the transaction reference as the provider
/// idempotency key: replaying a request with the same reference must not
/// disburse twice. An `Err` is an indeterminate outcome - the caller does
/// the bookkeeping either way.
#[async_trait]
pub trait DisbursementGateway: Send + Sync {
    async fn purchase_airtime(&self, request: AirtimeRequest) -> GatewayResult<Outcome>;

    async fn purchase_data(&self, request: DataRequest) -> GatewayResult<Outcome>;

    async fn initiate_bank_transfer(&self, request: TransferRequest) -> GatewayResult<Outcome>;

    /// Complete a transfer the provider parked on OTP validation.
    async fn validate_transfer_otp(&self, reference: &str, code: &str) -> GatewayResult<Outcome>;
}
