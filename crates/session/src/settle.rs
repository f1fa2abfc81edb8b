//! Settlement and the OTP step
//!
//! The ordering asymmetry here is load-bearing:
//!
//! - **airtime/data** call the gateway first and debit only on a confirmed
//!   success, so ambiguous or failed outcomes never need a refund;
//! - **bank transfer** debits first and then calls the gateway, so an
//!   explicit failure refunds exactly amount + fee.
//!
//! An indeterminate transfer outcome (provider `pending`, timeout,
//! transport error) keeps the debit and parks the record as `processing`
//! for out-of-band reconciliation - refunding an indeterminate transfer
//! could pay the beneficiary twice.
//!
//! Every settlement writes exactly one ledger record, keyed by a reference
//! generated here before any external call.

use kobopay_accounts::AccountError;
use kobopay_core::{Amount, UserId};
use kobopay_gateway::{
    AirtimeRequest, DataRequest, GatewayError, GatewayResult, Outcome, OutcomeStatus,
    TransferRequest,
};
use kobopay_ledger::{new_reference, Transaction, TxnStatus};

use crate::engine::{require, SessionEngine, StepResult};
use crate::error::{EngineError, EngineResult};
use crate::flow::{FlowType, StepKind};
use crate::state::Session;

impl SessionEngine {
    /// Run settlement for a session whose PIN just verified.
    pub(crate) async fn settle(&self, session: &mut Session) -> EngineResult<StepResult> {
        let amount = require(&session.fields.amount, "amount")?;
        let fee = require(&session.fields.fee, "fee")?;
        let total = amount
            .checked_add(fee)
            .ok_or_else(|| EngineError::Internal("total overflow at settlement".to_string()))?;

        let reference = new_reference(session.flow.kind());
        let txn = Transaction::pending(
            reference.as_str(),
            session.user_id.clone(),
            session.flow.kind(),
            amount,
            fee,
            total,
        );
        self.ledger.record(txn).await?;
        tracing::info!(
            user = %session.user_id,
            flow = %session.flow,
            reference = %reference,
            %amount,
            %fee,
            "settlement started"
        );

        match session.flow {
            FlowType::Airtime | FlowType::Data => {
                self.settle_prepaid(session, &reference, amount, total).await
            }
            FlowType::BankTransfer => {
                self.settle_transfer(session, &reference, amount, fee, total).await
            }
        }
    }

    /// Airtime/data: gateway first, debit only on confirmed success.
    async fn settle_prepaid(
        &self,
        session: &Session,
        reference: &str,
        amount: Amount,
        total: Amount,
    ) -> EngineResult<StepResult> {
        let user_id = &session.user_id;
        let what = match session.flow {
            FlowType::Airtime => format!("₦{amount} airtime"),
            _ => match &session.fields.plan {
                Some(plan) => format!("{} data", plan.label),
                None => "data bundle".to_string(),
            },
        };

        // Final affordability check, now that the fee is in the total.
        let balance = self.wallet.balance(user_id).await?;
        if total > balance {
            self.ledger
                .update_status(
                    reference,
                    TxnStatus::Failed,
                    Some("insufficient funds at settlement".to_string()),
                )
                .await?;
            return Ok(StepResult::Finish(format!(
                "Insufficient funds: you need ₦{total} but have ₦{balance}. You have not been debited."
            )));
        }

        let outcome = self.dispatch_prepaid(session, reference, amount).await;
        match outcome {
            Err(err) => {
                // Indeterminate, but no money has moved on our side.
                tracing::warn!(user = %user_id, reference = %reference, error = %err, "prepaid gateway call failed");
                self.ledger
                    .update_status(reference, TxnStatus::Failed, Some(err.to_string()))
                    .await?;
                Ok(StepResult::Finish(format!(
                    "We couldn't reach the provider, so nothing was purchased. \
                     You have not been debited. Please try again shortly. Ref: {reference}."
                )))
            }
            Ok(outcome) => match outcome.status {
                OutcomeStatus::Success => {
                    if let Some(external) = &outcome.external_reference {
                        self.ledger.set_external_reference(reference, external).await?;
                    }
                    match self.wallet.debit(user_id, total).await {
                        Ok(new_balance) => {
                            self.ledger
                                .update_status(reference, TxnStatus::Success, None)
                                .await?;
                            tracing::info!(user = %user_id, reference = %reference, "prepaid settlement succeeded");
                            let message = format!(
                                "{what} delivered! Ref: {reference}. New balance: ₦{new_balance}."
                            );
                            self.notify_quietly(user_id, &message).await;
                            Ok(StepResult::Finish(message))
                        }
                        Err(err) => {
                            // Only credits can interleave a settlement, so
                            // this should be unreachable; never record a
                            // success the wallet doesn't back.
                            tracing::error!(
                                user = %user_id,
                                reference = %reference,
                                error = %err,
                                "wallet debit failed after provider success; manual reconciliation required"
                            );
                            self.ledger
                                .update_status(
                                    reference,
                                    TxnStatus::Failed,
                                    Some("wallet debit failed after provider success".to_string()),
                                )
                                .await?;
                            Ok(StepResult::Finish(
                                "Something went wrong completing your purchase. Our team has been notified."
                                    .to_string(),
                            ))
                        }
                    }
                }
                OutcomeStatus::Pending => {
                    // Ambiguous provider response: do NOT debit. If the
                    // purchase later settles, reconciliation bills it.
                    self.ledger
                        .update_status(reference, TxnStatus::Processing, outcome.message.clone())
                        .await?;
                    let message = format!(
                        "Your {what} is still processing at the operator. Your funds are safe - \
                         you have not been debited. Ref: {reference}."
                    );
                    self.notify_quietly(user_id, &message).await;
                    Ok(StepResult::Finish(message))
                }
                OutcomeStatus::Failed => {
                    let reason = outcome
                        .message
                        .clone()
                        .unwrap_or_else(|| "provider declined".to_string());
                    self.ledger
                        .update_status(reference, TxnStatus::Failed, Some(reason.clone()))
                        .await?;
                    Ok(StepResult::Finish(format!(
                        "{what} failed: {reason}. You have not been debited."
                    )))
                }
                OutcomeStatus::OtpRequired => {
                    // Providers only demand OTPs on transfers; treat this as
                    // a provider fault.
                    tracing::error!(user = %user_id, reference = %reference, "unexpected OTP demand on prepaid purchase");
                    self.ledger
                        .update_status(
                            reference,
                            TxnStatus::Failed,
                            Some("unexpected OTP demand from provider".to_string()),
                        )
                        .await?;
                    Ok(StepResult::Finish(
                        "The provider returned an unexpected response. You have not been debited."
                            .to_string(),
                    ))
                }
            },
        }
    }

    /// Bank transfer: debit first, then call; refund on explicit failure.
    async fn settle_transfer(
        &self,
        session: &mut Session,
        reference: &str,
        amount: Amount,
        fee: Amount,
        total: Amount,
    ) -> EngineResult<StepResult> {
        let user_id = session.user_id.clone();
        let account_number = require(&session.fields.account_number, "account number")?;
        let bank_code = require(&session.fields.bank_code, "bank code")?;
        let beneficiary = session
            .fields
            .account_name
            .clone()
            .unwrap_or_else(|| "the beneficiary".to_string());

        match self.wallet.debit(&user_id, total).await {
            Ok(_) => {}
            Err(AccountError::InsufficientFunds { balance, .. }) => {
                self.ledger
                    .update_status(
                        reference,
                        TxnStatus::Failed,
                        Some("insufficient funds at settlement".to_string()),
                    )
                    .await?;
                return Ok(StepResult::Finish(format!(
                    "Insufficient funds: you need ₦{total} (₦{amount} + ₦{fee} fee) but have ₦{balance}."
                )));
            }
            Err(err) => return Err(err.into()),
        }

        let request = TransferRequest {
            amount,
            reference: reference.to_string(),
            account_number,
            bank_code,
            narration: format!("KoboPay/{user_id}"),
        };
        let outcome = self.bounded(self.gateway.initiate_bank_transfer(request)).await;

        match outcome {
            Ok(outcome) => {
                if let Some(external) = &outcome.external_reference {
                    self.ledger.set_external_reference(reference, external).await?;
                }
                match outcome.status {
                    OutcomeStatus::Success => {
                        self.ledger
                            .update_status(reference, TxnStatus::Success, None)
                            .await?;
                        let new_balance = self.wallet.balance(&user_id).await?;
                        tracing::info!(user = %user_id, reference = %reference, "transfer settled");
                        let message = format!(
                            "Transfer of ₦{amount} to {beneficiary} successful. Fee: ₦{fee}. \
                             Ref: {reference}. New balance: ₦{new_balance}."
                        );
                        self.notify_quietly(&user_id, &message).await;
                        Ok(StepResult::Finish(message))
                    }
                    OutcomeStatus::OtpRequired => {
                        self.ledger
                            .update_status(reference, TxnStatus::PendingOtp, None)
                            .await?;
                        session.fields.otp_reference = Some(reference.to_string());
                        tracing::info!(user = %user_id, reference = %reference, "transfer parked on OTP");
                        Ok(StepResult::Advance(
                            StepKind::Otp,
                            "The bank needs to confirm it's you. Enter the 6-digit OTP sent to \
                             your phone, or type cancel."
                                .to_string(),
                        ))
                    }
                    OutcomeStatus::Failed => {
                        let reason = outcome
                            .message
                            .clone()
                            .unwrap_or_else(|| "bank declined".to_string());
                        // Debit-then-fail implies refund, to the kobo.
                        self.wallet.credit(&user_id, total).await?;
                        self.ledger
                            .update_status(reference, TxnStatus::Failed, Some(reason.clone()))
                            .await?;
                        tracing::warn!(user = %user_id, reference = %reference, reason = %reason, "transfer failed, refunded");
                        Ok(StepResult::Finish(format!(
                            "Transfer failed: {reason}. ₦{total} has been returned to your wallet."
                        )))
                    }
                    OutcomeStatus::Pending => {
                        self.ledger
                            .update_status(reference, TxnStatus::Processing, outcome.message.clone())
                            .await?;
                        let message = format!(
                            "Your transfer of ₦{amount} to {beneficiary} is processing at the bank. \
                             We'll confirm shortly. Ref: {reference}."
                        );
                        self.notify_quietly(&user_id, &message).await;
                        Ok(StepResult::Finish(message))
                    }
                }
            }
            Err(err) => {
                // Indeterminate after the debit: keep the hold, reconcile
                // out of band. A refund here could pay twice.
                tracing::warn!(user = %user_id, reference = %reference, error = %err, "transfer outcome indeterminate");
                self.ledger
                    .update_status(
                        reference,
                        TxnStatus::Processing,
                        Some(format!("outcome indeterminate: {err}")),
                    )
                    .await?;
                Ok(StepResult::Finish(format!(
                    "We couldn't confirm your transfer with the bank. If it does not complete, \
                     ₦{total} will be returned to your wallet after reconciliation. Ref: {reference}."
                )))
            }
        }
    }

    /// The conditional OTP step (bank transfer only).
    pub(crate) async fn on_otp(&self, session: &mut Session, input: &str) -> EngineResult<StepResult> {
        let code = input.trim();
        if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(StepResult::Stay(
                "The OTP is the 6-digit code sent to your phone.".to_string(),
            ));
        }

        let reference = require(&session.fields.otp_reference, "otp reference")?;
        let outcome = self
            .bounded(self.gateway.validate_transfer_otp(&reference, code))
            .await;

        match outcome {
            Err(err) => {
                tracing::warn!(user = %session.user_id, reference = %reference, error = %err, "otp validation call failed");
                Ok(StepResult::Stay(
                    "We couldn't reach the bank to confirm the OTP. Try again in a moment."
                        .to_string(),
                ))
            }
            Ok(outcome) => match outcome.status {
                OutcomeStatus::Success => {
                    self.ledger
                        .update_status(&reference, TxnStatus::Success, None)
                        .await?;
                    let new_balance = self.wallet.balance(&session.user_id).await?;
                    tracing::info!(user = %session.user_id, reference = %reference, "transfer completed after OTP");
                    let message = format!(
                        "Transfer completed. Ref: {reference}. New balance: ₦{new_balance}."
                    );
                    self.notify_quietly(&session.user_id, &message).await;
                    Ok(StepResult::Finish(message))
                }
                OutcomeStatus::Failed => {
                    // Wrong code: retry freely, the debit already stands.
                    let reason = outcome
                        .message
                        .clone()
                        .unwrap_or_else(|| "incorrect OTP".to_string());
                    Ok(StepResult::Stay(format!("{reason}. Try again or type cancel.")))
                }
                OutcomeStatus::Pending | OutcomeStatus::OtpRequired => Ok(StepResult::Stay(
                    "The bank is still confirming that code. Enter the OTP again in a moment."
                        .to_string(),
                )),
            },
        }
    }

    /// Roll back an abandoned OTP exchange: refund the held total and close
    /// the transaction as failed.
    pub(crate) async fn abandon_otp(&self, session: &Session) -> EngineResult<()> {
        let Some(reference) = session.fields.otp_reference.clone() else {
            return Ok(());
        };
        let amount = require(&session.fields.amount, "amount")?;
        let fee = require(&session.fields.fee, "fee")?;
        let total = amount
            .checked_add(fee)
            .ok_or_else(|| EngineError::Internal("total overflow at refund".to_string()))?;

        self.wallet.credit(&session.user_id, total).await?;
        self.ledger
            .update_status(
                &reference,
                TxnStatus::Failed,
                Some("OTP abandoned by user".to_string()),
            )
            .await?;
        tracing::info!(user = %session.user_id, reference = %reference, "abandoned OTP transfer refunded");
        Ok(())
    }

    async fn dispatch_prepaid(
        &self,
        session: &Session,
        reference: &str,
        amount: Amount,
    ) -> GatewayResult<Outcome> {
        // Field presence was validated by the collection steps; a miss here
        // is indistinguishable from a misconfigured gateway to the caller.
        match session.flow {
            FlowType::Airtime => {
                let (Some(network), Some(msisdn)) =
                    (session.fields.network, session.fields.msisdn.clone())
                else {
                    return Err(GatewayError::Configuration(
                        "airtime settlement missing network or msisdn".to_string(),
                    ));
                };
                let request = AirtimeRequest {
                    network,
                    msisdn,
                    amount,
                    request_id: reference.to_string(),
                };
                self.bounded(self.gateway.purchase_airtime(request)).await
            }
            FlowType::Data => {
                let (Some(network), Some(msisdn), Some(plan)) = (
                    session.fields.network,
                    session.fields.msisdn.clone(),
                    session.fields.plan.clone(),
                ) else {
                    return Err(GatewayError::Configuration(
                        "data settlement missing network, msisdn or plan".to_string(),
                    ));
                };
                let request = DataRequest {
                    network,
                    msisdn,
                    plan_id: plan.id,
                    request_id: reference.to_string(),
                };
                self.bounded(self.gateway.purchase_data(request)).await
            }
            FlowType::BankTransfer => Err(GatewayError::Configuration(
                "transfer routed through prepaid settlement".to_string(),
            )),
        }
    }

    /// Wrap a gateway call in the configured timeout; elapsed means
    /// indeterminate, not skipped bookkeeping.
    async fn bounded<F>(&self, call: F) -> GatewayResult<Outcome>
    where
        F: std::future::Future<Output = GatewayResult<Outcome>>,
    {
        match tokio::time::timeout(self.config.disburse_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        }
    }

    pub(crate) async fn notify_quietly(&self, user_id: &UserId, message: &str) {
        if let Err(err) = self.notifier.notify(user_id, message).await {
            tracing::warn!(user = %user_id, error = %err, "notification failed");
        }
    }
}
