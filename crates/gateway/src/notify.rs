//! User notification sink
//!
//! Fire-and-forget: settlement never blocks on delivery. Callers log a
//! failed notify and move on.

use async_trait::async_trait;
use kobopay_core::UserId;

use crate::error::GatewayResult;

/// Pushes a message to the user over whatever chat transport is attached.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: &UserId, message: &str) -> GatewayResult<()>;
}

/// Notifier that just logs - the default for the CLI harness and tests.
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, user_id: &UserId, message: &str) -> GatewayResult<()> {
        tracing::info!(user = %user_id, message, "notify");
        Ok(())
    }
}
