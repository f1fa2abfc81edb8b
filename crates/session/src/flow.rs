//! Flow and step identifiers
//!
//! The engine is a finite-state machine keyed by `(FlowType, StepKind)`.
//! The unconditional spine of each flow lives in [`FlowType::next_step`];
//! conditional branches (manual beneficiary-name fallback, the OTP step)
//! are taken by the step handlers themselves.

use kobopay_ledger::TxnKind;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// One complete guided transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FlowType {
    Airtime,
    Data,
    BankTransfer,
}

impl FlowType {
    /// The transaction kind this flow settles as
    pub fn kind(&self) -> TxnKind {
        match self {
            FlowType::Airtime => TxnKind::Airtime,
            FlowType::Data => TxnKind::Data,
            FlowType::BankTransfer => TxnKind::BankTransfer,
        }
    }

    /// Short human label for prompts
    pub fn label(&self) -> &'static str {
        match self {
            FlowType::Airtime => "airtime purchase",
            FlowType::Data => "data purchase",
            FlowType::BankTransfer => "bank transfer",
        }
    }

    /// First input-collection step of the flow
    pub fn first_step(&self) -> StepKind {
        match self {
            FlowType::Airtime => StepKind::Amount,
            FlowType::Data => StepKind::Network,
            FlowType::BankTransfer => StepKind::Amount,
        }
    }

    /// The unconditional successor of `step` in this flow, if any.
    ///
    /// `None` for steps whose successor depends on runtime state: `Pin`
    /// settles (and may park on `Otp`), `AccountNumber` branches on whether
    /// the beneficiary resolved.
    pub fn next_step(&self, step: StepKind) -> Option<StepKind> {
        use StepKind::*;
        match (self, step) {
            (FlowType::Airtime, Amount) => Some(Phone),
            (FlowType::Airtime, Phone) => Some(Pin),

            (FlowType::Data, Network) => Some(Validity),
            (FlowType::Data, Validity) => Some(Plan),
            (FlowType::Data, Plan) => Some(Phone),
            (FlowType::Data, Phone) => Some(Pin),

            (FlowType::BankTransfer, Amount) => Some(Bank),
            (FlowType::BankTransfer, Bank) => Some(AccountNumber),
            (FlowType::BankTransfer, BeneficiaryName) => Some(Pin),

            _ => None,
        }
    }
}

/// One input-collection stage within a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Amount,
    Network,
    Validity,
    Plan,
    Phone,
    Bank,
    AccountNumber,
    /// Manual fallback when account resolution fails
    BeneficiaryName,
    Pin,
    /// Terminal transfer step, entered only when the provider demands it
    Otp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_airtime_spine() {
        let flow = FlowType::Airtime;
        assert_eq!(flow.first_step(), StepKind::Amount);
        assert_eq!(flow.next_step(StepKind::Amount), Some(StepKind::Phone));
        assert_eq!(flow.next_step(StepKind::Phone), Some(StepKind::Pin));
        assert_eq!(flow.next_step(StepKind::Pin), None);
    }

    #[test]
    fn test_data_spine() {
        let flow = FlowType::Data;
        assert_eq!(flow.first_step(), StepKind::Network);
        assert_eq!(flow.next_step(StepKind::Network), Some(StepKind::Validity));
        assert_eq!(flow.next_step(StepKind::Validity), Some(StepKind::Plan));
        assert_eq!(flow.next_step(StepKind::Plan), Some(StepKind::Phone));
        assert_eq!(flow.next_step(StepKind::Phone), Some(StepKind::Pin));
    }

    #[test]
    fn test_transfer_spine_branches_at_account_number() {
        let flow = FlowType::BankTransfer;
        assert_eq!(flow.first_step(), StepKind::Amount);
        assert_eq!(flow.next_step(StepKind::Amount), Some(StepKind::Bank));
        assert_eq!(flow.next_step(StepKind::Bank), Some(StepKind::AccountNumber));
        // Resolution decides between Pin and BeneficiaryName
        assert_eq!(flow.next_step(StepKind::AccountNumber), None);
        assert_eq!(flow.next_step(StepKind::BeneficiaryName), Some(StepKind::Pin));
    }

    #[test]
    fn test_flow_kinds() {
        assert_eq!(FlowType::Airtime.kind(), TxnKind::Airtime);
        assert_eq!(FlowType::BankTransfer.kind(), TxnKind::BankTransfer);
    }
}
