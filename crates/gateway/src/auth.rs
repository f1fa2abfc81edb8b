//! Provider auth-token cache
//!
//! Most Nigerian VTU/transfer providers issue short-lived bearer tokens.
//! Adapters cache the token slightly under its lifetime (55 minutes by
//! default against the usual 60) and re-fetch on expiry. Wallet balances
//! and session state are never cached here.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::error::GatewayResult;

const DEFAULT_TTL: Duration = Duration::from_secs(55 * 60);

struct CachedToken {
    token: String,
    fetched_at: Instant,
}

/// TTL cache for one provider bearer token.
pub struct TokenCache {
    ttl: Duration,
    state: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: RwLock::new(None),
        }
    }

    /// 55-minute TTL
    pub fn with_default_ttl() -> Self {
        Self::new(DEFAULT_TTL)
    }

    /// Return the cached token, or run `fetch` and cache its result.
    pub async fn get_or_refresh<F, Fut>(&self, fetch: F) -> GatewayResult<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = GatewayResult<String>>,
    {
        {
            let state = self.state.read().await;
            if let Some(cached) = state.as_ref() {
                if cached.fetched_at.elapsed() < self.ttl {
                    return Ok(cached.token.clone());
                }
            }
        }

        let mut state = self.state.write().await;
        // Another task may have refreshed while we waited for the write lock.
        if let Some(cached) = state.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(cached.token.clone());
            }
        }

        tracing::debug!("auth token missing or expired, refreshing");
        let token = fetch().await?;
        *state = Some(CachedToken {
            token: token.clone(),
            fetched_at: Instant::now(),
        });
        Ok(token)
    }

    /// Drop the cached token (e.g. after a 401 from the provider).
    pub async fn invalidate(&self) {
        *self.state.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_token_fetched_once_within_ttl() {
        let cache = TokenCache::new(Duration::from_secs(60));
        let fetches = AtomicU32::new(0);

        for _ in 0..3 {
            let token = cache
                .get_or_refresh(|| async {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    Ok("tok-1".to_string())
                })
                .await
                .unwrap();
            assert_eq!(token, "tok-1");
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_token_refreshed_after_expiry() {
        let cache = TokenCache::new(Duration::from_millis(20));

        let first = cache
            .get_or_refresh(|| async { Ok("tok-1".to_string()) })
            .await
            .unwrap();
        assert_eq!(first, "tok-1");

        tokio::time::sleep(Duration::from_millis(30)).await;

        let second = cache
            .get_or_refresh(|| async { Ok("tok-2".to_string()) })
            .await
            .unwrap();
        assert_eq!(second, "tok-2");
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let cache = TokenCache::new(Duration::from_secs(60));
        cache
            .get_or_refresh(|| async { Ok("tok-1".to_string()) })
            .await
            .unwrap();

        cache.invalidate().await;

        let token = cache
            .get_or_refresh(|| async { Ok("tok-2".to_string()) })
            .await
            .unwrap();
        assert_eq!(token, "tok-2");
    }

    #[tokio::test]
    async fn test_fetch_error_propagates_and_nothing_cached() {
        let cache = TokenCache::new(Duration::from_secs(60));
        let result = cache
            .get_or_refresh(|| async {
                Err(crate::error::GatewayError::Transport("boom".to_string()))
            })
            .await;
        assert!(result.is_err());

        // A later successful fetch still runs
        let token = cache
            .get_or_refresh(|| async { Ok("tok-1".to_string()) })
            .await
            .unwrap();
        assert_eq!(token, "tok-1");
    }
}
