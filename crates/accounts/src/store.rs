//! User repository trait and in-memory implementation

use std::collections::HashMap;

use async_trait::async_trait;
use kobopay_core::{Amount, User, UserId};
use tokio::sync::Mutex;

use crate::error::{AccountError, AccountResult};

/// Repository of user records.
///
/// `debit` and `credit` are atomic with respect to each other and to
/// themselves: two concurrent debits for the same user must never both
/// observe a balance that only covers one of them. Implementations do the
/// check-and-subtract under a single lock or equivalent.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch a user, creating a fresh record on first sight.
    async fn get_or_create(&self, id: &UserId) -> AccountResult<User>;

    /// Fetch an existing user.
    async fn get(&self, id: &UserId) -> AccountResult<Option<User>>;

    /// Replace the stored record (profile and PIN mutations).
    async fn save(&self, user: User) -> AccountResult<()>;

    /// Atomically subtract `amount` iff the balance covers it.
    /// Returns the new balance.
    async fn debit(&self, id: &UserId, amount: Amount) -> AccountResult<Amount>;

    /// Atomically add `amount`. Returns the new balance.
    async fn credit(&self, id: &UserId, amount: Amount) -> AccountResult<Amount>;
}

/// In-memory user store.
///
/// The whole map sits behind one `tokio::sync::Mutex`, so every operation
/// is serialized and `debit` is a true check-and-subtract.
pub struct InMemoryUserStore {
    users: Mutex<HashMap<UserId, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_or_create(&self, id: &UserId) -> AccountResult<User> {
        let mut users = self.users.lock().await;
        let user = users
            .entry(id.clone())
            .or_insert_with(|| User::new(id.clone()));
        Ok(user.clone())
    }

    async fn get(&self, id: &UserId) -> AccountResult<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.get(id).cloned())
    }

    async fn save(&self, user: User) -> AccountResult<()> {
        let mut users = self.users.lock().await;
        users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn debit(&self, id: &UserId, amount: Amount) -> AccountResult<Amount> {
        let mut users = self.users.lock().await;
        let user = users
            .get_mut(id)
            .ok_or_else(|| AccountError::UserNotFound(id.clone()))?;

        let new_balance = user
            .wallet_balance
            .checked_sub(amount)
            .ok_or(AccountError::InsufficientFunds {
                balance: user.wallet_balance,
                requested: amount,
            })?;
        user.wallet_balance = new_balance;
        Ok(new_balance)
    }

    async fn credit(&self, id: &UserId, amount: Amount) -> AccountResult<Amount> {
        let mut users = self.users.lock().await;
        let user = users
            .get_mut(id)
            .ok_or_else(|| AccountError::UserNotFound(id.clone()))?;

        let new_balance = user
            .wallet_balance
            .checked_add(amount)
            .ok_or(AccountError::BalanceOverflow)?;
        user.wallet_balance = new_balance;
        Ok(new_balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let store = InMemoryUserStore::new();
        let id = UserId::from("u-1");

        let first = store.get_or_create(&id).await.unwrap();
        let second = store.get_or_create(&id).await.unwrap();
        assert_eq!(first.created_at, second.created_at);
    }

    #[tokio::test]
    async fn test_debit_unknown_user() {
        let store = InMemoryUserStore::new();
        let result = store.debit(&UserId::from("ghost"), Amount::from_naira(10)).await;
        assert!(matches!(result, Err(AccountError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_debit_insufficient() {
        let store = InMemoryUserStore::new();
        let id = UserId::from("u-1");
        store.get_or_create(&id).await.unwrap();
        store.credit(&id, Amount::from_naira(100)).await.unwrap();

        let result = store.debit(&id, Amount::from_naira(150)).await;
        assert!(matches!(result, Err(AccountError::InsufficientFunds { .. })));

        // Balance untouched by the failed debit
        let user = store.get(&id).await.unwrap().unwrap();
        assert_eq!(user.wallet_balance, Amount::from_naira(100));
    }

    #[tokio::test]
    async fn test_concurrent_debits_cannot_double_spend() {
        let store = Arc::new(InMemoryUserStore::new());
        let id = UserId::from("u-1");
        store.get_or_create(&id).await.unwrap();
        store.credit(&id, Amount::from_naira(100)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..2 {
            let store = Arc::clone(&store);
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                store.debit(&id, Amount::from_naira(80)).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        // Only one of the two 80-naira debits can fit in a 100-naira wallet.
        assert_eq!(successes, 1);
        let user = store.get(&id).await.unwrap().unwrap();
        assert_eq!(user.wallet_balance, Amount::from_naira(20));
    }
}
