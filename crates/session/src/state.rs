//! Session state and storage
//!
//! A session is exclusively owned by the engine; other components only ever
//! see extracted fields at settlement time. The store keys sessions by
//! user, which is what enforces at-most-one-live-session-per-user.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kobopay_core::{AccountNumber, Amount, BankCode, Msisdn, Network, UserId};
use kobopay_gateway::{DataPlan, Validity};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::EngineResult;
use crate::flow::{FlowType, StepKind};

/// Validated inputs collected so far.
///
/// Fields fill in as steps pass validation; settlement reads them out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectedFields {
    pub amount: Option<Amount>,
    pub fee: Option<Amount>,
    pub msisdn: Option<Msisdn>,
    pub network: Option<Network>,
    pub validity: Option<Validity>,
    pub plan: Option<DataPlan>,
    pub bank_code: Option<BankCode>,
    pub account_number: Option<AccountNumber>,
    pub account_name: Option<String>,
    pub bank_name: Option<String>,
    /// Reference of the transaction parked on OTP validation
    pub otp_reference: Option<String>,
}

/// One user's in-flight flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub flow: FlowType,
    pub step: StepKind,
    pub fields: CollectedFields,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: UserId, flow: FlowType, ttl: chrono::Duration) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            flow,
            step: flow.first_step(),
            fields: CollectedFields::default(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Push the expiry out after a handled message.
    pub fn touch(&mut self, ttl: chrono::Duration) {
        self.expires_at = Utc::now() + ttl;
    }
}

/// Repository of live sessions, one per user.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, user_id: &UserId) -> EngineResult<Option<Session>>;

    /// Insert or replace the user's session.
    async fn put(&self, session: Session) -> EngineResult<()>;

    /// Remove and return the user's session, if any.
    async fn remove(&self, user_id: &UserId) -> EngineResult<Option<Session>>;
}

/// In-memory session store.
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<UserId, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, user_id: &UserId) -> EngineResult<Option<Session>> {
        Ok(self.sessions.lock().await.get(user_id).cloned())
    }

    async fn put(&self, session: Session) -> EngineResult<()> {
        self.sessions
            .lock()
            .await
            .insert(session.user_id.clone(), session);
        Ok(())
    }

    async fn remove(&self, user_id: &UserId) -> EngineResult<Option<Session>> {
        Ok(self.sessions.lock().await.remove(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_starts_at_first_step() {
        let s = Session::new(UserId::from("u-1"), FlowType::Data, chrono::Duration::minutes(30));
        assert_eq!(s.step, StepKind::Network);
        assert!(!s.is_expired());
    }

    #[test]
    fn test_expiry() {
        let mut s = Session::new(
            UserId::from("u-1"),
            FlowType::Airtime,
            chrono::Duration::minutes(30),
        );
        s.expires_at = Utc::now() - chrono::Duration::seconds(1);
        assert!(s.is_expired());

        s.touch(chrono::Duration::minutes(30));
        assert!(!s.is_expired());
    }

    #[tokio::test]
    async fn test_put_replaces_existing_session() {
        let store = InMemorySessionStore::new();
        let id = UserId::from("u-1");
        let ttl = chrono::Duration::minutes(30);

        store.put(Session::new(id.clone(), FlowType::Airtime, ttl)).await.unwrap();
        store.put(Session::new(id.clone(), FlowType::Data, ttl)).await.unwrap();

        // One live session per user: the second put replaced the first
        let session = store.get(&id).await.unwrap().unwrap();
        assert_eq!(session.flow, FlowType::Data);

        assert!(store.remove(&id).await.unwrap().is_some());
        assert!(store.get(&id).await.unwrap().is_none());
    }
}
