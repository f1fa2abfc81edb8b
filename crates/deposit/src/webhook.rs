//! Incoming-payment webhook intake
//!
//! The provider posts `{amount, destination account, provider reference}`
//! whenever money lands in a virtual account. The provider reference is the
//! idempotency key: it is attached to the deposit transaction before the
//! wallet is credited, so a redelivered webhook finds the record and stops.

use std::sync::Arc;

use kobopay_accounts::UserStore;
use kobopay_core::{AccountNumber, Amount, UserId};
use kobopay_gateway::Notifier;
use kobopay_ledger::{new_reference, Transaction, TransactionStore, TxnKind, TxnStatus};
use serde::{Deserialize, Serialize};

use crate::error::DepositResult;
use crate::virtual_account::VirtualAccountStore;

/// One incoming-payment notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub amount: Amount,
    pub destination_account_number: AccountNumber,
    /// Provider-side id of the payment; duplicates carry the same value
    pub provider_reference: String,
}

/// What intake did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositOutcome {
    Credited {
        reference: String,
        user_id: UserId,
        new_balance: Amount,
    },
    /// Same provider reference seen before; nothing was credited
    Duplicate { reference: String },
    /// No virtual account matches the destination; nothing was credited
    UnknownAccount,
}

/// Credits wallets from incoming-payment webhooks.
pub struct DepositProcessor {
    accounts: Arc<dyn VirtualAccountStore>,
    users: Arc<dyn UserStore>,
    ledger: Arc<dyn TransactionStore>,
    notifier: Arc<dyn Notifier>,
}

impl DepositProcessor {
    pub fn new(
        accounts: Arc<dyn VirtualAccountStore>,
        users: Arc<dyn UserStore>,
        ledger: Arc<dyn TransactionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            accounts,
            users,
            ledger,
            notifier,
        }
    }

    pub async fn process(&self, event: WebhookEvent) -> DepositResult<DepositOutcome> {
        // Idempotency probe before anything moves.
        if let Some(existing) = self
            .ledger
            .find_by_external_reference(&event.provider_reference)
            .await?
        {
            tracing::info!(
                provider_reference = %event.provider_reference,
                reference = %existing.reference,
                "duplicate webhook delivery ignored"
            );
            return Ok(DepositOutcome::Duplicate {
                reference: existing.reference,
            });
        }

        let Some(account) = self
            .accounts
            .find_by_account_number(&event.destination_account_number)
            .await?
        else {
            tracing::error!(
                destination = %event.destination_account_number,
                provider_reference = %event.provider_reference,
                "webhook for unknown virtual account"
            );
            return Ok(DepositOutcome::UnknownAccount);
        };

        let user_id = account.user_id.clone();
        self.users.get_or_create(&user_id).await?;

        // Record first, with the provider reference attached, so a crashed
        // or redelivered intake cannot credit twice.
        let reference = new_reference(TxnKind::Deposit);
        let txn = Transaction::pending(
            reference.as_str(),
            user_id.clone(),
            TxnKind::Deposit,
            event.amount,
            Amount::ZERO,
            event.amount,
        );
        self.ledger.record(txn).await?;
        self.ledger
            .set_external_reference(&reference, &event.provider_reference)
            .await?;

        let new_balance = self.users.credit(&user_id, event.amount).await?;
        self.ledger
            .update_status(&reference, TxnStatus::Success, None)
            .await?;
        tracing::info!(
            user = %user_id,
            reference = %reference,
            amount = %event.amount,
            %new_balance,
            "deposit credited"
        );

        let message = format!(
            "Your wallet has been credited with ₦{}. New balance: ₦{new_balance}. Ref: {reference}.",
            event.amount
        );
        if let Err(err) = self.notifier.notify(&user_id, &message).await {
            tracing::warn!(user = %user_id, error = %err, "deposit notification failed");
        }

        Ok(DepositOutcome::Credited {
            reference,
            user_id,
            new_balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_account::{
        InMemoryVirtualAccountStore, SandboxAccountProvider, VirtualAccount, VirtualAccounts,
    };
    use kobopay_accounts::InMemoryUserStore;
    use kobopay_gateway::TracingNotifier;
    use kobopay_ledger::InMemoryTransactionStore;

    struct Fixture {
        processor: DepositProcessor,
        accounts: VirtualAccounts,
        users: Arc<InMemoryUserStore>,
        ledger: Arc<InMemoryTransactionStore>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryVirtualAccountStore::new());
        let users = Arc::new(InMemoryUserStore::new());
        let ledger = Arc::new(InMemoryTransactionStore::new());
        Fixture {
            processor: DepositProcessor::new(
                store.clone(),
                users.clone(),
                ledger.clone(),
                Arc::new(TracingNotifier),
            ),
            accounts: VirtualAccounts::new(store, Arc::new(SandboxAccountProvider::new())),
            users,
            ledger,
        }
    }

    fn event(account: &VirtualAccount, amount: u64, provider_reference: &str) -> WebhookEvent {
        WebhookEvent {
            amount: Amount::from_naira(amount),
            destination_account_number: account.account_number.clone(),
            provider_reference: provider_reference.to_string(),
        }
    }

    #[tokio::test]
    async fn test_deposit_credits_wallet_and_records_transaction() {
        let fx = fixture();
        let user = UserId::from("u-1");
        fx.users.get_or_create(&user).await.unwrap();
        let account = fx.accounts.ensure(&user).await.unwrap();

        let outcome = fx
            .processor
            .process(event(&account, 2000, "prov-1"))
            .await
            .unwrap();

        match outcome {
            DepositOutcome::Credited { new_balance, .. } => {
                assert_eq!(new_balance, Amount::from_naira(2000));
            }
            other => panic!("expected credit, got {other:?}"),
        }

        let txns = fx.ledger.list_for_user(&user, 10).await.unwrap();
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].kind, TxnKind::Deposit);
        assert_eq!(txns[0].status, TxnStatus::Success);
        assert_eq!(txns[0].external_reference.as_deref(), Some("prov-1"));
    }

    #[tokio::test]
    async fn test_duplicate_webhook_credits_exactly_once() {
        let fx = fixture();
        let user = UserId::from("u-1");
        fx.users.get_or_create(&user).await.unwrap();
        let account = fx.accounts.ensure(&user).await.unwrap();

        fx.processor
            .process(event(&account, 2000, "prov-1"))
            .await
            .unwrap();
        let second = fx
            .processor
            .process(event(&account, 2000, "prov-1"))
            .await
            .unwrap();

        assert!(matches!(second, DepositOutcome::Duplicate { .. }));

        // Exactly one credit, exactly one deposit record
        let balance = fx.users.get(&user).await.unwrap().unwrap().wallet_balance;
        assert_eq!(balance, Amount::from_naira(2000));
        assert_eq!(fx.ledger.list_for_user(&user, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_destination_credits_nothing() {
        let fx = fixture();
        let outcome = fx
            .processor
            .process(WebhookEvent {
                amount: Amount::from_naira(1000),
                destination_account_number: "9000009999".parse().unwrap(),
                provider_reference: "prov-x".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(outcome, DepositOutcome::UnknownAccount);
    }

    #[tokio::test]
    async fn test_distinct_references_credit_separately() {
        let fx = fixture();
        let user = UserId::from("u-1");
        fx.users.get_or_create(&user).await.unwrap();
        let account = fx.accounts.ensure(&user).await.unwrap();

        fx.processor
            .process(event(&account, 1000, "prov-1"))
            .await
            .unwrap();
        fx.processor
            .process(event(&account, 500, "prov-2"))
            .await
            .unwrap();

        let balance = fx.users.get(&user).await.unwrap().unwrap().wallet_balance;
        assert_eq!(balance, Amount::from_naira(1500));
        assert_eq!(fx.ledger.list_for_user(&user, 10).await.unwrap().len(), 2);
    }
}
