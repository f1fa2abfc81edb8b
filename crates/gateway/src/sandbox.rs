//! Deterministic in-process provider
//!
//! Stands in for the real VTU/transfer adapters in the CLI harness and
//! integration tests, the way real providers expose sandbox environments
//! with magic trigger values:
//!
//! - airtime/data amount `666` -> declined, `777` -> pending
//! - transfer to account `0000000000` -> declined, `1111111111` -> pending
//! - transfers at or above the OTP threshold park on OTP (code `123456`)
//! - beneficiary accounts starting `99` do not resolve
//!
//! Every call is recorded so tests can assert exactly-once dispatch.

use std::collections::HashMap;

use async_trait::async_trait;
use kobopay_core::{AccountNumber, Amount, BankCode};
use tokio::sync::Mutex;

use crate::disbursement::DisbursementGateway;
use crate::error::GatewayResult;
use crate::resolve::{AccountResolver, Resolution};
use crate::types::{AirtimeRequest, DataRequest, Outcome, TransferRequest};

pub const SANDBOX_OTP: &str = "123456";

/// Scripted disbursement provider.
pub struct SandboxGateway {
    /// Transfers at or above this amount demand an OTP; `None` disables it
    otp_threshold: Option<Amount>,
    calls: Mutex<Vec<String>>,
}

impl SandboxGateway {
    pub fn new() -> Self {
        Self {
            otp_threshold: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Demand an OTP for transfers of `threshold` or more.
    pub fn with_otp_threshold(threshold: Amount) -> Self {
        Self {
            otp_threshold: Some(threshold),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Operations dispatched so far, as `op:request_id` strings.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    async fn log_call(&self, op: &str, request_id: &str) {
        self.calls.lock().await.push(format!("{op}:{request_id}"));
    }

    fn external_ref(request_id: &str) -> String {
        format!("sbx-{request_id}")
    }
}

impl Default for SandboxGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DisbursementGateway for SandboxGateway {
    async fn purchase_airtime(&self, request: AirtimeRequest) -> GatewayResult<Outcome> {
        self.log_call("airtime", &request.request_id).await;
        Ok(match request.amount {
            a if a == Amount::from_naira(666) => Outcome::failed("sandbox: declined"),
            a if a == Amount::from_naira(777) => Outcome::pending("sandbox: queued at operator"),
            _ => Outcome::success(Self::external_ref(&request.request_id)),
        })
    }

    async fn purchase_data(&self, request: DataRequest) -> GatewayResult<Outcome> {
        self.log_call("data", &request.request_id).await;
        Ok(Outcome::success(Self::external_ref(&request.request_id)))
    }

    async fn initiate_bank_transfer(&self, request: TransferRequest) -> GatewayResult<Outcome> {
        self.log_call("transfer", &request.reference).await;

        if request.account_number.as_str() == "0000000000" {
            return Ok(Outcome::failed("sandbox: beneficiary bank declined"));
        }
        if request.account_number.as_str() == "1111111111" {
            return Ok(Outcome::pending("sandbox: queued at clearing"));
        }
        if let Some(threshold) = self.otp_threshold {
            if request.amount >= threshold {
                return Ok(Outcome::otp_required(Self::external_ref(&request.reference)));
            }
        }
        Ok(Outcome::success(Self::external_ref(&request.reference)))
    }

    async fn validate_transfer_otp(&self, reference: &str, code: &str) -> GatewayResult<Outcome> {
        self.log_call("otp", reference).await;
        if code == SANDBOX_OTP {
            Ok(Outcome::success(Self::external_ref(reference)))
        } else {
            Ok(Outcome::failed("sandbox: incorrect OTP"))
        }
    }
}

/// Scripted account resolver with a small bank directory.
pub struct SandboxResolver {
    banks: HashMap<&'static str, &'static str>,
}

impl SandboxResolver {
    pub fn new() -> Self {
        let banks = HashMap::from([
            ("044", "Access Bank"),
            ("033", "United Bank for Africa"),
            ("057", "Zenith Bank"),
            ("058", "Guaranty Trust Bank"),
            ("50211", "Kuda Microfinance Bank"),
        ]);
        Self { banks }
    }
}

impl Default for SandboxResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountResolver for SandboxResolver {
    async fn resolve(
        &self,
        account_number: &AccountNumber,
        bank_code: &BankCode,
    ) -> GatewayResult<Option<Resolution>> {
        let Some(bank_name) = self.banks.get(bank_code.as_str()) else {
            return Ok(None);
        };
        if account_number.as_str().starts_with("99") {
            return Ok(None);
        }
        Ok(Some(Resolution {
            account_name: "ADAOBI CHUKWU".to_string(),
            bank_name: bank_name.to_string(),
        }))
    }
}
