//! Transaction store trait and in-memory implementation

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use kobopay_core::UserId;
use tokio::sync::Mutex;

use crate::error::{LedgerError, LedgerResult};
use crate::transaction::{Transaction, TxnStatus};

/// Append-only repository of transaction records.
///
/// `record` refuses duplicate references - a settlement attempt can never
/// create two records for one confirmation. Retries of the same logical
/// request go through `update_status` against the existing record.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Insert a new record. Fails on a duplicate reference.
    async fn record(&self, txn: Transaction) -> LedgerResult<()>;

    /// Move a record to `status`, validating the transition. Sets
    /// `completed_at` when the target is terminal and stores `reason` when
    /// given. Returns the updated record.
    async fn update_status(
        &self,
        reference: &str,
        status: TxnStatus,
        reason: Option<String>,
    ) -> LedgerResult<Transaction>;

    /// Attach the provider-side reference once the gateway accepts.
    async fn set_external_reference(&self, reference: &str, external: &str) -> LedgerResult<()>;

    async fn find_by_reference(&self, reference: &str) -> LedgerResult<Option<Transaction>>;

    /// Lookup by provider reference - the webhook idempotency probe.
    async fn find_by_external_reference(
        &self,
        external: &str,
    ) -> LedgerResult<Option<Transaction>>;

    /// Most recent transactions for a user, newest first.
    async fn list_for_user(&self, user_id: &UserId, limit: usize) -> LedgerResult<Vec<Transaction>>;
}

#[derive(Default)]
struct Inner {
    by_reference: HashMap<String, Transaction>,
    /// Insertion order, oldest first
    order: Vec<String>,
}

/// In-memory transaction store.
pub struct InMemoryTransactionStore {
    inner: Mutex<Inner>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }
}

impl Default for InMemoryTransactionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn record(&self, txn: Transaction) -> LedgerResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.by_reference.contains_key(&txn.reference) {
            return Err(LedgerError::DuplicateReference(txn.reference));
        }
        inner.order.push(txn.reference.clone());
        inner.by_reference.insert(txn.reference.clone(), txn);
        Ok(())
    }

    async fn update_status(
        &self,
        reference: &str,
        status: TxnStatus,
        reason: Option<String>,
    ) -> LedgerResult<Transaction> {
        let mut inner = self.inner.lock().await;
        let txn = inner
            .by_reference
            .get_mut(reference)
            .ok_or_else(|| LedgerError::NotFound(reference.to_string()))?;

        if !txn.status.can_transition_to(status) {
            return Err(LedgerError::InvalidTransition {
                reference: reference.to_string(),
                from: txn.status,
                to: status,
            });
        }

        txn.status = status;
        if let Some(reason) = reason {
            txn.reason = Some(reason);
        }
        if status.is_terminal() {
            txn.completed_at = Some(Utc::now());
        }
        Ok(txn.clone())
    }

    async fn set_external_reference(&self, reference: &str, external: &str) -> LedgerResult<()> {
        let mut inner = self.inner.lock().await;
        let txn = inner
            .by_reference
            .get_mut(reference)
            .ok_or_else(|| LedgerError::NotFound(reference.to_string()))?;
        txn.external_reference = Some(external.to_string());
        Ok(())
    }

    async fn find_by_reference(&self, reference: &str) -> LedgerResult<Option<Transaction>> {
        let inner = self.inner.lock().await;
        Ok(inner.by_reference.get(reference).cloned())
    }

    async fn find_by_external_reference(
        &self,
        external: &str,
    ) -> LedgerResult<Option<Transaction>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .by_reference
            .values()
            .find(|t| t.external_reference.as_deref() == Some(external))
            .cloned())
    }

    async fn list_for_user(&self, user_id: &UserId, limit: usize) -> LedgerResult<Vec<Transaction>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .order
            .iter()
            .rev()
            .filter_map(|r| inner.by_reference.get(r))
            .filter(|t| &t.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TxnKind;
    use kobopay_core::Amount;

    fn txn(reference: &str, user: &str) -> Transaction {
        Transaction::pending(
            reference,
            UserId::from(user),
            TxnKind::Airtime,
            Amount::from_naira(500),
            Amount::ZERO,
            Amount::from_naira(500),
        )
    }

    #[tokio::test]
    async fn test_duplicate_reference_rejected() {
        let store = InMemoryTransactionStore::new();
        store.record(txn("KP-AIR-1", "u-1")).await.unwrap();

        let result = store.record(txn("KP-AIR-1", "u-1")).await;
        assert!(matches!(result, Err(LedgerError::DuplicateReference(_))));
    }

    #[tokio::test]
    async fn test_update_status_validates_transition() {
        let store = InMemoryTransactionStore::new();
        store.record(txn("KP-AIR-1", "u-1")).await.unwrap();

        store
            .update_status("KP-AIR-1", TxnStatus::Success, None)
            .await
            .unwrap();

        // Terminal: no further movement
        let result = store
            .update_status("KP-AIR-1", TxnStatus::Failed, None)
            .await;
        assert!(matches!(result, Err(LedgerError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_terminal_update_sets_completed_at() {
        let store = InMemoryTransactionStore::new();
        store.record(txn("KP-AIR-1", "u-1")).await.unwrap();

        let updated = store
            .update_status("KP-AIR-1", TxnStatus::Failed, Some("declined".to_string()))
            .await
            .unwrap();
        assert!(updated.completed_at.is_some());
        assert_eq!(updated.reason.as_deref(), Some("declined"));
    }

    #[tokio::test]
    async fn test_unknown_reference() {
        let store = InMemoryTransactionStore::new();
        let result = store.update_status("missing", TxnStatus::Success, None).await;
        assert!(matches!(result, Err(LedgerError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_find_by_external_reference() {
        let store = InMemoryTransactionStore::new();
        store.record(txn("KP-DEP-1", "u-1")).await.unwrap();
        store
            .set_external_reference("KP-DEP-1", "prov-123")
            .await
            .unwrap();

        let found = store.find_by_external_reference("prov-123").await.unwrap();
        assert_eq!(found.unwrap().reference, "KP-DEP-1");
        assert!(store
            .find_by_external_reference("prov-999")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_list_for_user_newest_first_with_limit() {
        let store = InMemoryTransactionStore::new();
        for i in 0..5 {
            store.record(txn(&format!("KP-AIR-{i}"), "u-1")).await.unwrap();
        }
        store.record(txn("KP-AIR-other", "u-2")).await.unwrap();

        let listed = store.list_for_user(&UserId::from("u-1"), 3).await.unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].reference, "KP-AIR-4");
        assert_eq!(listed[2].reference, "KP-AIR-2");
    }
}
