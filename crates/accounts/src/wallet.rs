//! Wallet ledger facade
//!
//! Thin wrapper over [`UserStore`] exposing the wallet contract the rest of
//! the system programs against: atomic debit with insufficient-funds
//! checking, credit, and balance lookup.

use std::sync::Arc;

use kobopay_core::{Amount, UserId};

use crate::error::{AccountError, AccountResult};
use crate::store::UserStore;

/// The wallet ledger.
///
/// Debit-then-external-call-then-possible-refund flows rely on `debit`
/// being a single check-and-subtract; the store upholds that.
#[derive(Clone)]
pub struct WalletLedger {
    store: Arc<dyn UserStore>,
}

impl WalletLedger {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Subtract `amount` iff the balance covers it. No partial debit.
    pub async fn debit(&self, id: &UserId, amount: Amount) -> AccountResult<Amount> {
        self.store.debit(id, amount).await
    }

    /// Add `amount` to the wallet. Returns the new balance.
    pub async fn credit(&self, id: &UserId, amount: Amount) -> AccountResult<Amount> {
        self.store.credit(id, amount).await
    }

    /// Current balance.
    pub async fn balance(&self, id: &UserId) -> AccountResult<Amount> {
        let user = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| AccountError::UserNotFound(id.clone()))?;
        Ok(user.wallet_balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryUserStore;

    #[tokio::test]
    async fn test_debit_credit_balance() {
        let store = Arc::new(InMemoryUserStore::new());
        let id = UserId::from("u-1");
        store.get_or_create(&id).await.unwrap();
        let ledger = WalletLedger::new(store);

        ledger.credit(&id, Amount::from_naira(1000)).await.unwrap();
        assert_eq!(ledger.balance(&id).await.unwrap(), Amount::from_naira(1000));

        let after = ledger.debit(&id, Amount::from_naira(400)).await.unwrap();
        assert_eq!(after, Amount::from_naira(600));
        assert_eq!(ledger.balance(&id).await.unwrap(), Amount::from_naira(600));
    }

    #[tokio::test]
    async fn test_debit_never_goes_negative() {
        let store = Arc::new(InMemoryUserStore::new());
        let id = UserId::from("u-1");
        store.get_or_create(&id).await.unwrap();
        let ledger = WalletLedger::new(store);

        ledger.credit(&id, Amount::from_naira(50)).await.unwrap();
        let result = ledger.debit(&id, Amount::from_naira(51)).await;
        assert!(matches!(result, Err(AccountError::InsufficientFunds { .. })));
        assert_eq!(ledger.balance(&id).await.unwrap(), Amount::from_naira(50));
    }

    #[tokio::test]
    async fn test_balance_unknown_user() {
        let store = Arc::new(InMemoryUserStore::new());
        let ledger = WalletLedger::new(store);
        let result = ledger.balance(&UserId::from("ghost")).await;
        assert!(matches!(result, Err(AccountError::UserNotFound(_))));
    }
}
