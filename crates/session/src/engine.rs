//! The session engine
//!
//! Public API plus the input-collection step handlers. Settlement and the
//! OTP step live in [`crate::settle`].
//!
//! Concurrency: one async mutex per user serializes message handling, so a
//! user never has two handlers (and therefore never two settlements) in
//! flight at once. The wallet's atomic debit covers whatever that lock
//! cannot see, e.g. deposit webhooks crediting mid-flow.

use std::collections::HashMap;
use std::sync::Arc;

use kobopay_accounts::{PinGuard, PinVerdict, UserStore, WalletLedger};
use kobopay_core::{AccountNumber, BankCode, KycStatus, Msisdn, Network, UserId};
use kobopay_gateway::{AccountResolver, DisbursementGateway, Notifier, PlanCatalog};
use kobopay_ledger::TransactionStore;
use tokio::sync::Mutex;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::flow::{FlowType, StepKind};
use crate::state::{Session, SessionStore};

/// What the engine sends back to the transport for one incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// True when no session is live for the user after this turn
    pub ended: bool,
}

impl Reply {
    pub(crate) fn prompt(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ended: false,
        }
    }

    pub(crate) fn end(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ended: true,
        }
    }
}

/// Result of running one step handler.
pub(crate) enum StepResult {
    /// Input rejected; re-prompt the same step
    Stay(String),
    /// Input accepted; move to the given step
    Advance(StepKind, String),
    /// Flow is over (settled, aborted, or fatally rejected)
    Finish(String),
}

/// Injected collaborators. The engine owns no storage or transport itself.
pub struct EngineDeps {
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub ledger: Arc<dyn TransactionStore>,
    pub gateway: Arc<dyn DisbursementGateway>,
    pub resolver: Arc<dyn AccountResolver>,
    pub catalog: Arc<dyn PlanCatalog>,
    pub notifier: Arc<dyn Notifier>,
}

/// The per-user, per-flow conversation state machine.
pub struct SessionEngine {
    pub(crate) users: Arc<dyn UserStore>,
    pub(crate) wallet: WalletLedger,
    pub(crate) pin_guard: PinGuard,
    pub(crate) sessions: Arc<dyn SessionStore>,
    pub(crate) ledger: Arc<dyn TransactionStore>,
    pub(crate) gateway: Arc<dyn DisbursementGateway>,
    pub(crate) resolver: Arc<dyn AccountResolver>,
    pub(crate) catalog: Arc<dyn PlanCatalog>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) config: EngineConfig,
    user_locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl SessionEngine {
    pub fn new(deps: EngineDeps, config: EngineConfig) -> Self {
        Self {
            wallet: WalletLedger::new(deps.users.clone()),
            pin_guard: PinGuard::new(deps.users.clone()),
            users: deps.users,
            sessions: deps.sessions,
            ledger: deps.ledger,
            gateway: deps.gateway,
            resolver: deps.resolver,
            catalog: deps.catalog,
            notifier: deps.notifier,
            config,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The flow the user currently has in progress, if any.
    pub async fn active_flow(&self, user_id: &UserId) -> EngineResult<Option<FlowType>> {
        Ok(self.sessions.get(user_id).await?.map(|s| s.flow))
    }

    /// Begin a flow for the user, replacing any session already live.
    pub async fn start_flow(&self, user_id: &UserId, flow: FlowType) -> EngineResult<Reply> {
        let _guard = self.lock_user(user_id).await;

        let user = self.users.get_or_create(user_id).await?;
        if !user.active {
            return Ok(Reply::end(
                "Your account has been deactivated. Please contact support.",
            ));
        }
        if user.kyc_status != KycStatus::Approved {
            return Ok(Reply::end(
                "Your identity verification is not complete yet, so transactions are disabled.",
            ));
        }
        if user.pin_locked {
            return Ok(Reply::end(
                "Your account is locked after too many incorrect PIN attempts. Please contact support.",
            ));
        }
        if !user.has_pin() {
            return Ok(Reply::end(
                "You need a transaction PIN before you can transact. Set one first.",
            ));
        }

        let replaced = match self.sessions.remove(user_id).await? {
            Some(old) => {
                if old.step == StepKind::Otp {
                    self.abandon_otp(&old).await?;
                }
                true
            }
            None => false,
        };

        let session = Session::new(user_id.clone(), flow, self.config.session_ttl);
        let intro = self.intro_prompt(flow).await?;
        self.sessions.put(session).await?;
        tracing::info!(user = %user_id, flow = %flow, replaced, "flow started");

        let text = if replaced {
            format!("Your previous session was cancelled.\n{intro}")
        } else {
            intro
        };
        Ok(Reply::prompt(text))
    }

    /// Feed one user message into the state machine.
    pub async fn handle(&self, user_id: &UserId, input: &str) -> EngineResult<Reply> {
        let _guard = self.lock_user(user_id).await;

        let input = input.trim();
        if input.eq_ignore_ascii_case("cancel") {
            return self.cancel_locked(user_id).await;
        }

        let Some(mut session) = self.sessions.get(user_id).await? else {
            return Ok(Reply::end("You have no transaction in progress."));
        };

        if session.is_expired() {
            self.sessions.remove(user_id).await?;
            tracing::info!(user = %user_id, flow = %session.flow, "session expired");
            return Ok(Reply::end(
                "That session has expired. Please start the transaction again.",
            ));
        }
        session.touch(self.config.session_ttl);

        match self.dispatch(&mut session, input).await? {
            StepResult::Stay(text) => {
                self.sessions.put(session).await?;
                Ok(Reply::prompt(text))
            }
            StepResult::Advance(step, text) => {
                session.step = step;
                self.sessions.put(session).await?;
                Ok(Reply::prompt(text))
            }
            StepResult::Finish(text) => {
                self.sessions.remove(user_id).await?;
                Ok(Reply::end(text))
            }
        }
    }

    /// Explicitly cancel the user's session, if any.
    pub async fn cancel(&self, user_id: &UserId) -> EngineResult<Reply> {
        let _guard = self.lock_user(user_id).await;
        self.cancel_locked(user_id).await
    }

    async fn cancel_locked(&self, user_id: &UserId) -> EngineResult<Reply> {
        match self.sessions.remove(user_id).await? {
            None => Ok(Reply::end("You have no transaction in progress.")),
            Some(session) => {
                tracing::info!(user = %user_id, flow = %session.flow, step = %session.step, "session cancelled");
                if session.step == StepKind::Otp {
                    self.abandon_otp(&session).await?;
                    Ok(Reply::end(
                        "Transfer cancelled. The debited amount has been returned to your wallet.",
                    ))
                } else {
                    Ok(Reply::end(format!("Your {} was cancelled.", session.flow.label())))
                }
            }
        }
    }

    async fn lock_user(&self, user_id: &UserId) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.user_locks.lock().await;
            locks
                .entry(user_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    async fn intro_prompt(&self, flow: FlowType) -> EngineResult<String> {
        Ok(match flow {
            FlowType::Airtime => format!(
                "How much airtime would you like to buy? (₦{} - ₦{})",
                self.config.airtime_min, self.config.airtime_max
            ),
            FlowType::Data => {
                let networks = self.catalog.networks().await.map_err(|e| {
                    EngineError::Storage(format!("plan catalog unavailable: {e}"))
                })?;
                format!(
                    "Which network is the data for?\n{}",
                    menu(&networks, |n| n.to_string())
                )
            }
            FlowType::BankTransfer => format!(
                "How much would you like to send? (₦{} - ₦{}). A {}% fee applies.",
                self.config.transfer_min, self.config.transfer_max, self.config.transfer_fee_percent
            ),
        })
    }

    async fn dispatch(&self, session: &mut Session, input: &str) -> EngineResult<StepResult> {
        match session.step {
            StepKind::Amount => self.on_amount(session, input).await,
            StepKind::Network => self.on_network(session, input).await,
            StepKind::Validity => self.on_validity(session, input).await,
            StepKind::Plan => self.on_plan(session, input).await,
            StepKind::Phone => self.on_phone(session, input).await,
            StepKind::Bank => self.on_bank(session, input).await,
            StepKind::AccountNumber => self.on_account_number(session, input).await,
            StepKind::BeneficiaryName => self.on_beneficiary_name(session, input).await,
            StepKind::Pin => self.on_pin(session, input).await,
            StepKind::Otp => self.on_otp(session, input).await,
        }
    }

    // === Input-collection steps ===

    async fn on_amount(&self, session: &mut Session, input: &str) -> EngineResult<StepResult> {
        let (min, max) = match session.flow {
            FlowType::Airtime => (self.config.airtime_min, self.config.airtime_max),
            FlowType::BankTransfer => (self.config.transfer_min, self.config.transfer_max),
            FlowType::Data => {
                return Err(EngineError::Internal(
                    "amount step reached in data flow".to_string(),
                ))
            }
        };

        let amount = match input.parse::<kobopay_core::Amount>() {
            Ok(a) => a,
            Err(_) => {
                return Ok(StepResult::Stay(format!(
                    "That doesn't look like an amount. Enter a number between ₦{min} and ₦{max}."
                )))
            }
        };
        if amount < min {
            return Ok(StepResult::Stay(format!("The minimum amount is ₦{min}.")));
        }
        if amount > max {
            return Ok(StepResult::Stay(format!("The maximum amount is ₦{max}.")));
        }

        // Fees are checked again at confirmation; here the amount alone
        // must fit the wallet.
        let balance = self.wallet.balance(&session.user_id).await?;
        if amount > balance {
            return Ok(StepResult::Finish(format!(
                "Insufficient funds: your balance is ₦{balance}. Top up and try again."
            )));
        }

        session.fields.amount = Some(amount);
        Ok(match session.flow {
            FlowType::Airtime => StepResult::Advance(
                StepKind::Phone,
                format!("Which number should receive the ₦{amount} airtime?"),
            ),
            FlowType::BankTransfer => StepResult::Advance(
                StepKind::Bank,
                "Enter the recipient's bank code (e.g. 058 for GTBank).".to_string(),
            ),
            FlowType::Data => unreachable!("rejected above"),
        })
    }

    async fn on_network(&self, session: &mut Session, input: &str) -> EngineResult<StepResult> {
        let networks = self
            .catalog
            .networks()
            .await
            .map_err(|e| EngineError::Storage(format!("plan catalog unavailable: {e}")))?;

        let Some(network) = pick(input, &networks, |n| n.to_string()).copied() else {
            return Ok(StepResult::Stay(format!(
                "Please pick a network:\n{}",
                menu(&networks, |n| n.to_string())
            )));
        };

        let validities = self
            .catalog
            .validities(network)
            .await
            .map_err(|e| EngineError::Storage(format!("plan catalog unavailable: {e}")))?;
        session.fields.network = Some(network);
        Ok(StepResult::Advance(
            StepKind::Validity,
            format!(
                "{network} it is. How long should the bundle last?\n{}",
                menu(&validities, |v| v.to_string())
            ),
        ))
    }

    async fn on_validity(&self, session: &mut Session, input: &str) -> EngineResult<StepResult> {
        let network = require(&session.fields.network, "network")?;
        let validities = self
            .catalog
            .validities(network)
            .await
            .map_err(|e| EngineError::Storage(format!("plan catalog unavailable: {e}")))?;

        let Some(validity) = pick(input, &validities, |v| v.to_string()).copied() else {
            return Ok(StepResult::Stay(format!(
                "Please pick a validity:\n{}",
                menu(&validities, |v| v.to_string())
            )));
        };

        let plans = self
            .catalog
            .plans(network, validity)
            .await
            .map_err(|e| EngineError::Storage(format!("plan catalog unavailable: {e}")))?;
        if plans.is_empty() {
            return Ok(StepResult::Finish(format!(
                "No {validity} plans are available for {network} right now."
            )));
        }

        session.fields.validity = Some(validity);
        Ok(StepResult::Advance(
            StepKind::Plan,
            format!(
                "Pick a plan (a ₦{} service fee applies):\n{}",
                self.config.data_service_fee,
                menu(&plans, |p| format!("{} - ₦{}", p.label, p.price))
            ),
        ))
    }

    async fn on_plan(&self, session: &mut Session, input: &str) -> EngineResult<StepResult> {
        let network = require(&session.fields.network, "network")?;
        let validity = require(&session.fields.validity, "validity")?;
        let plans = self
            .catalog
            .plans(network, validity)
            .await
            .map_err(|e| EngineError::Storage(format!("plan catalog unavailable: {e}")))?;

        let Some(plan) = pick(input, &plans, |p| p.label.clone()).cloned() else {
            return Ok(StepResult::Stay(format!(
                "Please pick one of the listed plans:\n{}",
                menu(&plans, |p| format!("{} - ₦{}", p.label, p.price))
            )));
        };

        let fee = self.config.data_service_fee;
        let total = plan
            .price
            .checked_add(fee)
            .ok_or_else(|| EngineError::Internal("plan total overflow".to_string()))?;
        let balance = self.wallet.balance(&session.user_id).await?;
        if total > balance {
            // Rejected before the flow ever reaches phone entry.
            return Ok(StepResult::Finish(format!(
                "{} costs ₦{} + ₦{fee} service fee = ₦{total}, but your balance is ₦{balance}.",
                plan.label, plan.price
            )));
        }

        session.fields.amount = Some(plan.price);
        session.fields.fee = Some(fee);
        session.fields.plan = Some(plan.clone());
        Ok(StepResult::Advance(
            StepKind::Phone,
            format!("Which number is the {} bundle for?", plan.label),
        ))
    }

    async fn on_phone(&self, session: &mut Session, input: &str) -> EngineResult<StepResult> {
        let msisdn = match input.parse::<Msisdn>() {
            Ok(m) => m,
            Err(_) => {
                return Ok(StepResult::Stay(
                    "Enter a valid Nigerian mobile number, e.g. 08012345678.".to_string(),
                ))
            }
        };

        match session.flow {
            FlowType::Airtime => {
                // Operator comes from the prefix; a number we can't place
                // can't be topped up.
                let Some(network) = Network::from_msisdn(&msisdn) else {
                    return Ok(StepResult::Stay(format!(
                        "We couldn't determine the operator for {msisdn}. Try a different number."
                    )));
                };
                session.fields.network = Some(network);
            }
            FlowType::Data => {
                let chosen = require(&session.fields.network, "network")?;
                if let Some(detected) = Network::from_msisdn(&msisdn) {
                    if detected != chosen {
                        return Ok(StepResult::Stay(format!(
                            "{msisdn} looks like a {detected} line, but you picked a {chosen} plan. \
                             Enter a {chosen} number."
                        )));
                    }
                }
            }
            FlowType::BankTransfer => {
                return Err(EngineError::Internal(
                    "phone step reached in transfer flow".to_string(),
                ))
            }
        }

        session.fields.msisdn = Some(msisdn);
        self.to_confirmation(session).await
    }

    async fn on_bank(&self, session: &mut Session, input: &str) -> EngineResult<StepResult> {
        let bank_code = match input.parse::<BankCode>() {
            Ok(b) => b,
            Err(_) => {
                return Ok(StepResult::Stay(
                    "Bank codes are 3 to 6 digits, e.g. 058 for GTBank.".to_string(),
                ))
            }
        };
        session.fields.bank_code = Some(bank_code);
        Ok(StepResult::Advance(
            StepKind::AccountNumber,
            "Enter the recipient's 10-digit account number.".to_string(),
        ))
    }

    async fn on_account_number(
        &self,
        session: &mut Session,
        input: &str,
    ) -> EngineResult<StepResult> {
        let account_number = match input.parse::<AccountNumber>() {
            Ok(a) => a,
            Err(_) => {
                return Ok(StepResult::Stay(
                    "Account numbers are exactly 10 digits.".to_string(),
                ))
            }
        };
        let bank_code = require(&session.fields.bank_code, "bank code")?;

        let resolution = match tokio::time::timeout(
            self.config.resolve_timeout,
            self.resolver.resolve(&account_number, &bank_code),
        )
        .await
        {
            Ok(Ok(resolution)) => resolution,
            Ok(Err(err)) => {
                tracing::warn!(user = %session.user_id, error = %err, "account resolution failed");
                None
            }
            Err(_) => {
                tracing::warn!(user = %session.user_id, "account resolution timed out");
                None
            }
        };

        session.fields.account_number = Some(account_number);
        match resolution {
            Some(resolved) => {
                session.fields.account_name = Some(resolved.account_name);
                session.fields.bank_name = Some(resolved.bank_name);
                self.to_confirmation(session).await
            }
            None => Ok(StepResult::Advance(
                StepKind::BeneficiaryName,
                "We couldn't verify that account automatically. \
                 Enter the beneficiary's full name to continue, or type cancel."
                    .to_string(),
            )),
        }
    }

    async fn on_beneficiary_name(
        &self,
        session: &mut Session,
        input: &str,
    ) -> EngineResult<StepResult> {
        let name = input.trim();
        if name.len() < 3 {
            return Ok(StepResult::Stay(
                "Enter the beneficiary's full name.".to_string(),
            ));
        }
        session.fields.account_name = Some(name.to_string());
        self.to_confirmation(session).await
    }

    async fn on_pin(&self, session: &mut Session, input: &str) -> EngineResult<StepResult> {
        match self.pin_guard.verify(&session.user_id, input).await? {
            PinVerdict::Correct => self.settle(session).await,
            PinVerdict::Incorrect { attempts_remaining } => Ok(StepResult::Stay(format!(
                "Incorrect PIN. {attempts_remaining} attempt{} remaining.",
                if attempts_remaining == 1 { "" } else { "s" }
            ))),
            PinVerdict::LockedOut => Ok(StepResult::Finish(
                "Too many incorrect PIN attempts. Your account is now locked; please contact support."
                    .to_string(),
            )),
            PinVerdict::NotSet => Ok(StepResult::Finish(
                "You haven't set a transaction PIN. Set one and start again.".to_string(),
            )),
        }
    }

    /// Build the confirmation summary and park the session on the PIN step.
    ///
    /// This is the last affordability check before settlement: the fee is
    /// now known, so amount + fee must fit the balance.
    async fn to_confirmation(&self, session: &mut Session) -> EngineResult<StepResult> {
        let amount = require(&session.fields.amount, "amount")?;
        let fee = self.fee_for(session.flow, amount);
        session.fields.fee = Some(fee);
        let total = amount
            .checked_add(fee)
            .ok_or_else(|| EngineError::Internal("total overflow".to_string()))?;

        let balance = self.wallet.balance(&session.user_id).await?;
        let Some(balance_after) = balance.checked_sub(total) else {
            return Ok(StepResult::Finish(format!(
                "Insufficient funds: this {} needs ₦{total} (₦{amount} + ₦{fee} fee), \
                 but your balance is ₦{balance}.",
                session.flow.label()
            )));
        };

        let what = match session.flow {
            FlowType::Airtime => {
                let msisdn = require(&session.fields.msisdn, "msisdn")?;
                let network = require(&session.fields.network, "network")?;
                format!("₦{amount} {network} airtime for {msisdn}")
            }
            FlowType::Data => {
                let msisdn = require(&session.fields.msisdn, "msisdn")?;
                let plan = require(&session.fields.plan, "plan")?;
                format!("{} ({}) for {msisdn}", plan.label, plan.network)
            }
            FlowType::BankTransfer => {
                let number = require(&session.fields.account_number, "account number")?;
                let bank_code = require(&session.fields.bank_code, "bank code")?;
                let name = session
                    .fields
                    .account_name
                    .clone()
                    .unwrap_or_else(|| "the beneficiary".to_string());
                let bank = session
                    .fields
                    .bank_name
                    .clone()
                    .unwrap_or_else(|| format!("bank {bank_code}"));
                format!("₦{amount} to {name}, {number} ({bank})")
            }
        };

        Ok(StepResult::Advance(
            StepKind::Pin,
            format!(
                "You are paying for: {what}\nAmount: ₦{amount}\nFee: ₦{fee}\nTotal: ₦{total}\n\
                 Balance after: ₦{balance_after}\n\nEnter your 4-digit PIN to confirm, or type cancel."
            ),
        ))
    }

    pub(crate) fn fee_for(&self, flow: FlowType, amount: kobopay_core::Amount) -> kobopay_core::Amount {
        match flow {
            FlowType::Airtime => kobopay_core::Amount::ZERO,
            FlowType::Data => self.config.data_service_fee,
            FlowType::BankTransfer => amount.percentage(self.config.transfer_fee_percent),
        }
    }
}

/// Resolve a menu selection by 1-based index or case-insensitive label.
pub(crate) fn pick<'a, T>(input: &str, items: &'a [T], label: impl Fn(&T) -> String) -> Option<&'a T> {
    if let Ok(n) = input.trim().parse::<usize>() {
        if (1..=items.len()).contains(&n) {
            return items.get(n - 1);
        }
        return None;
    }
    let needle = input.trim().to_lowercase();
    items.iter().find(|item| label(item).to_lowercase() == needle)
}

/// Render a numbered menu, one item per line.
pub(crate) fn menu<T>(items: &[T], label: impl Fn(&T) -> String) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("  {}. {}", i + 1, label(item)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extract a field settlement depends on; absence is an engine bug.
pub(crate) fn require<T: Clone>(field: &Option<T>, what: &str) -> EngineResult<T> {
    field
        .clone()
        .ok_or_else(|| EngineError::Internal(format!("{what} missing from session")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_by_index() {
        let items = vec!["MTN", "Glo", "Airtel"];
        assert_eq!(pick("2", &items, |s| s.to_string()), Some(&"Glo"));
        assert_eq!(pick("0", &items, |s| s.to_string()), None);
        assert_eq!(pick("4", &items, |s| s.to_string()), None);
    }

    #[test]
    fn test_pick_by_label() {
        let items = vec!["MTN", "Glo", "Airtel"];
        assert_eq!(pick("mtn", &items, |s| s.to_string()), Some(&"MTN"));
        assert_eq!(pick("AIRTEL", &items, |s| s.to_string()), Some(&"Airtel"));
        assert_eq!(pick("vodafone", &items, |s| s.to_string()), None);
    }

    #[test]
    fn test_menu_rendering() {
        let items = vec!["daily", "weekly"];
        assert_eq!(menu(&items, |s| s.to_string()), "  1. daily\n  2. weekly");
    }

    #[test]
    fn test_require() {
        assert_eq!(require(&Some(5), "x").unwrap(), 5);
        assert!(require::<u32>(&None, "x").is_err());
    }
}
