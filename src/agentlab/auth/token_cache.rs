//! Scope-keyed bearer-token memoization.

use crate::agentlab::auth::{AccessToken, AuthenticationError, TokenCredential};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Caches one [`AccessToken`] per scope and refreshes it from the wrapped
/// [`TokenCredential`] once it has expired.
///
/// The expiry check and the refresh run under a single async lock, so concurrent
/// callers for an expired scope wait for one fetch instead of each issuing their own.
///
/// ```rust,no_run
/// use agentlab::auth::{BearerTokenCache, DefaultCredential};
/// use std::sync::Arc;
///
/// # async {
/// let cache = BearerTokenCache::new(Arc::new(DefaultCredential::from_env()));
/// let first = cache.get_token("https://dynamicsessions.io/.default").await?;
/// // Served from the cache until the token expires.
/// let second = cache.get_token("https://dynamicsessions.io/.default").await?;
/// assert_eq!(first, second);
/// # Ok::<(), agentlab::auth::AuthenticationError>(())
/// # };
/// ```
pub struct BearerTokenCache {
    credential: Arc<dyn TokenCredential>,
    tokens: Mutex<HashMap<String, AccessToken>>,
    clock: fn() -> i64,
}

fn utc_now() -> i64 {
    Utc::now().timestamp()
}

impl BearerTokenCache {
    pub fn new(credential: Arc<dyn TokenCredential>) -> Self {
        Self {
            credential,
            tokens: Mutex::new(HashMap::new()),
            clock: utc_now,
        }
    }

    /// Replace the UTC clock (unix seconds) used for expiry checks.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Return a valid token for `scope`, fetching one only when none is cached or
    /// the cached one has expired.
    pub async fn get_token(&self, scope: &str) -> Result<String, AuthenticationError> {
        let mut tokens = self.tokens.lock().await;
        let now = (self.clock)();

        if let Some(cached) = tokens.get(scope) {
            if !cached.is_expired_at(now) {
                return Ok(cached.token.clone());
            }
            log::debug!(
                "BearerTokenCache::get_token(...): token for '{}' expired at {}, refreshing",
                scope,
                cached.expires_on
            );
        }

        let fresh = match self.credential.get_token(scope).await {
            Ok(token) => token,
            Err(err) => {
                log::error!(
                    "BearerTokenCache::get_token(...): {} could not issue a token for '{}': {}",
                    self.credential.credential_name(),
                    scope,
                    err
                );
                return Err(err);
            }
        };

        let value = fresh.token.clone();
        tokens.insert(scope.to_string(), fresh);
        Ok(value)
    }

    /// Drop every cached token; the next call per scope fetches again.
    pub async fn clear(&self) {
        self.tokens.lock().await.clear();
    }

    pub fn credential(&self) -> &Arc<dyn TokenCredential> {
        &self.credential
    }
}

/// A [`BearerTokenCache`] bound to one scope: the auth callback handed to clients.
#[derive(Clone)]
pub struct BearerTokenProvider {
    cache: Arc<BearerTokenCache>,
    scope: String,
}

impl BearerTokenProvider {
    pub fn new(cache: Arc<BearerTokenCache>, scope: impl Into<String>) -> Self {
        Self {
            cache,
            scope: scope.into(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub async fn get_token(&self) -> Result<String, AuthenticationError> {
        self.cache.get_token(&self.scope).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

    struct CountingCredential {
        fetches: AtomicUsize,
        lifetime_secs: i64,
    }

    #[async_trait]
    impl TokenCredential for CountingCredential {
        async fn get_token(&self, scope: &str) -> Result<AccessToken, AuthenticationError> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(AccessToken::new(
                format!("{}#{}", scope, n),
                CLOCK.load(Ordering::SeqCst) + self.lifetime_secs,
            ))
        }

        fn credential_name(&self) -> &str {
            "CountingCredential"
        }
    }

    static CLOCK: AtomicI64 = AtomicI64::new(1_700_000_000);

    fn test_clock() -> i64 {
        CLOCK.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_refetches_only_after_expiry() {
        let credential = Arc::new(CountingCredential {
            fetches: AtomicUsize::new(0),
            lifetime_secs: 3_600,
        });
        let cache = BearerTokenCache::new(credential.clone()).with_clock(test_clock);

        let first = cache.get_token("scope-a").await.unwrap();
        let second = cache.get_token("scope-a").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(credential.fetches.load(Ordering::SeqCst), 1);

        CLOCK.fetch_add(3_600, Ordering::SeqCst);
        let third = cache.get_token("scope-a").await.unwrap();
        assert_ne!(first, third);
        assert_eq!(credential.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_provider_binds_scope() {
        let credential = Arc::new(CountingCredential {
            fetches: AtomicUsize::new(0),
            lifetime_secs: 3_600,
        });
        let cache = Arc::new(BearerTokenCache::new(credential.clone()));
        let provider = BearerTokenProvider::new(cache, "https://dynamicsessions.io/.default");

        let token = provider.get_token().await.unwrap();
        assert!(token.starts_with("https://dynamicsessions.io/.default#"));
        assert_eq!(provider.scope(), "https://dynamicsessions.io/.default");
    }
}
