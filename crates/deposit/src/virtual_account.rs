//! Virtual deposit accounts
//!
//! One per user, created on first deposit request and looked up by
//! incoming-payment webhooks to identify who to credit.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kobopay_core::{AccountNumber, UserId};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{DepositError, DepositResult};

/// A provider-issued bank account dedicated to one user's deposits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualAccount {
    pub user_id: UserId,
    /// Our reference for the provisioning request
    pub account_reference: String,
    pub account_number: AccountNumber,
    pub bank_name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Repository of virtual accounts.
#[async_trait]
pub trait VirtualAccountStore: Send + Sync {
    async fn get_for_user(&self, user_id: &UserId) -> DepositResult<Option<VirtualAccount>>;

    async fn find_by_account_number(
        &self,
        account_number: &AccountNumber,
    ) -> DepositResult<Option<VirtualAccount>>;

    async fn put(&self, account: VirtualAccount) -> DepositResult<()>;
}

/// Provider-side provisioning: actually opens the account.
#[async_trait]
pub trait VirtualAccountProvider: Send + Sync {
    async fn issue(&self, user_id: &UserId) -> DepositResult<VirtualAccount>;
}

/// In-memory virtual account store.
pub struct InMemoryVirtualAccountStore {
    accounts: Mutex<HashMap<UserId, VirtualAccount>>,
}

impl InMemoryVirtualAccountStore {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryVirtualAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VirtualAccountStore for InMemoryVirtualAccountStore {
    async fn get_for_user(&self, user_id: &UserId) -> DepositResult<Option<VirtualAccount>> {
        Ok(self.accounts.lock().await.get(user_id).cloned())
    }

    async fn find_by_account_number(
        &self,
        account_number: &AccountNumber,
    ) -> DepositResult<Option<VirtualAccount>> {
        Ok(self
            .accounts
            .lock()
            .await
            .values()
            .find(|a| &a.account_number == account_number)
            .cloned())
    }

    async fn put(&self, account: VirtualAccount) -> DepositResult<()> {
        self.accounts
            .lock()
            .await
            .insert(account.user_id.clone(), account);
        Ok(())
    }
}

/// Deterministic sandbox provisioner: sequential `90xxxxxxxx` numbers at a
/// fixed partner bank.
pub struct SandboxAccountProvider {
    next: Mutex<u32>,
}

impl SandboxAccountProvider {
    pub fn new() -> Self {
        Self { next: Mutex::new(1) }
    }
}

impl Default for SandboxAccountProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VirtualAccountProvider for SandboxAccountProvider {
    async fn issue(&self, user_id: &UserId) -> DepositResult<VirtualAccount> {
        let mut next = self.next.lock().await;
        let number: AccountNumber = format!("90{:08}", *next)
            .parse()
            .map_err(|e| DepositError::Provisioning(format!("{e}")))?;
        *next += 1;

        Ok(VirtualAccount {
            user_id: user_id.clone(),
            account_reference: format!("KPVA-{}", uuid::Uuid::new_v4().simple()),
            account_number: number,
            bank_name: "Wema Bank".to_string(),
            active: true,
            created_at: Utc::now(),
        })
    }
}

/// Get-or-create facade over store + provider.
pub struct VirtualAccounts {
    store: Arc<dyn VirtualAccountStore>,
    provider: Arc<dyn VirtualAccountProvider>,
}

impl VirtualAccounts {
    pub fn new(
        store: Arc<dyn VirtualAccountStore>,
        provider: Arc<dyn VirtualAccountProvider>,
    ) -> Self {
        Self { store, provider }
    }

    /// The user's deposit account, provisioned on first request.
    pub async fn ensure(&self, user_id: &UserId) -> DepositResult<VirtualAccount> {
        if let Some(existing) = self.store.get_for_user(user_id).await? {
            return Ok(existing);
        }
        let account = self.provider.issue(user_id).await?;
        tracing::info!(
            user = %user_id,
            account_number = %account.account_number,
            bank = %account.bank_name,
            "virtual account provisioned"
        );
        self.store.put(account.clone()).await?;
        Ok(account)
    }
}
