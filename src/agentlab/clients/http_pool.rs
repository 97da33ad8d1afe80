//! HTTP client pool keeping one persistent `reqwest::Client` per base URL.
//!
//! Chat completion calls, token requests and remote code execution calls all go
//! through here, so DNS lookups and TLS handshakes are reused across requests.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Global HTTP client pool, lazily initialized on first access.
static HTTP_CLIENT_POOL: Lazy<Mutex<HashMap<String, reqwest::Client>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Get or create a shared HTTP client for the given base URL.
///
/// Request timeouts are not baked into the pooled client; callers set them per
/// request so one pool entry can serve callers with different budgets.
pub fn get_or_create_client(base_url: &str) -> reqwest::Client {
    let mut pool = match HTTP_CLIENT_POOL.lock() {
        Ok(pool) => pool,
        Err(poisoned) => poisoned.into_inner(),
    };

    if let Some(client) = pool.get(base_url) {
        return client.clone();
    }

    let client = create_pooled_client();
    pool.insert(base_url.to_string(), client.clone());
    client
}

/// Build a client tuned for persistent connections.
///
/// - `pool_idle_timeout(90s)`: keeps idle connections alive
/// - `pool_max_idle_per_host(10)`
/// - `tcp_keepalive(60s)`
/// - `connect_timeout(30s)`
fn create_pooled_client() -> reqwest::Client {
    reqwest::ClientBuilder::new()
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .pool_max_idle_per_host(10)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|err| {
            log::warn!(
                "agentlab::clients::http_pool::create_pooled_client(): falling back to default client: {}",
                err
            );
            reqwest::Client::new()
        })
}

/// Pool key for a URL: scheme + authority, so every path on one host shares a client.
pub fn base_url_of(url: &str) -> &str {
    let after_scheme = url.find("://").map(|i| i + 3).unwrap_or(0);
    match url[after_scheme..].find('/') {
        Some(slash) => &url[..after_scheme + slash],
        None => url,
    }
}
