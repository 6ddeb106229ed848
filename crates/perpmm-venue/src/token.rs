//! Bearer-token manager.
//!
//! One async mutex serializes refresh races; readers holding a token that
//! is still valid past the safety margin take the fast path without any
//! network traffic.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use crate::api::AuthApi;
use crate::error::VenueResult;

/// Validity margin subtracted from the token TTL on reads.
const SAFETY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Caching token manager over an `AuthApi`.
pub struct TokenManager {
    auth: Arc<dyn AuthApi>,
    state: Mutex<Option<CachedToken>>,
}

impl TokenManager {
    pub fn new(auth: Arc<dyn AuthApi>) -> Self {
        Self {
            auth,
            state: Mutex::new(None),
        }
    }

    /// A token valid for at least the safety margin, refreshing if needed.
    pub async fn current(&self) -> VenueResult<String> {
        let mut state = self.state.lock().await;
        if let Some(cached) = state.as_ref() {
            if cached.expires_at > Instant::now() + SAFETY_MARGIN {
                return Ok(cached.token.clone());
            }
            debug!("Cached token inside safety margin; refreshing");
        }
        self.refresh_locked(&mut state).await
    }

    /// Force a refresh regardless of the cached token's validity.
    pub async fn refresh(&self) -> VenueResult<String> {
        let mut state = self.state.lock().await;
        self.refresh_locked(&mut state).await
    }

    async fn refresh_locked(&self, state: &mut Option<CachedToken>) -> VenueResult<String> {
        let fresh = self.auth.authenticate().await?;
        let cached = CachedToken {
            token: fresh.access_token,
            expires_at: Instant::now() + Duration::from_secs(fresh.expires_in_seconds),
        };
        let token = cached.token.clone();
        *state = Some(cached);
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AuthToken;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct CountingAuth {
        calls: AtomicU64,
        ttl: u64,
    }

    #[async_trait]
    impl AuthApi for CountingAuth {
        async fn authenticate(&self) -> VenueResult<AuthToken> {
            let n = self.calls.fetch_add(1, Ordering::AcqRel) + 1;
            Ok(AuthToken {
                access_token: format!("token-{n}"),
                expires_in_seconds: self.ttl,
            })
        }
    }

    #[tokio::test]
    async fn test_fast_path_reuses_valid_token() {
        let auth = Arc::new(CountingAuth {
            calls: AtomicU64::new(0),
            ttl: 900,
        });
        let manager = TokenManager::new(auth.clone());

        assert_eq!(manager.current().await.unwrap(), "token-1");
        assert_eq!(manager.current().await.unwrap(), "token-1");
        assert_eq!(auth.calls.load(Ordering::Acquire), 1);
    }

    #[tokio::test]
    async fn test_token_inside_margin_is_refreshed() {
        // TTL below the 60s margin: every read re-authenticates.
        let auth = Arc::new(CountingAuth {
            calls: AtomicU64::new(0),
            ttl: 10,
        });
        let manager = TokenManager::new(auth.clone());

        assert_eq!(manager.current().await.unwrap(), "token-1");
        assert_eq!(manager.current().await.unwrap(), "token-2");
        assert_eq!(auth.calls.load(Ordering::Acquire), 2);
    }

    #[tokio::test]
    async fn test_refresh_is_forced() {
        let auth = Arc::new(CountingAuth {
            calls: AtomicU64::new(0),
            ttl: 900,
        });
        let manager = TokenManager::new(auth.clone());

        assert_eq!(manager.current().await.unwrap(), "token-1");
        assert_eq!(manager.refresh().await.unwrap(), "token-2");
        assert_eq!(manager.current().await.unwrap(), "token-2");
    }
}
