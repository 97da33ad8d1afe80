//! Azure credentials and bearer-token caching.
//!
//! Two layers live here:
//!
//! - [`TokenCredential`] implementations that talk to an identity provider
//!   ([`ClientSecretCredential`], [`AzureCliCredential`], and the ordered
//!   [`DefaultCredential`] chain).
//! - [`BearerTokenCache`], which memoizes tokens per scope and refreshes them once
//!   they expire. [`BearerTokenProvider`] binds a cache to one scope and is what the
//!   HTTP clients hold.
//!
//! ```rust,no_run
//! use agentlab::auth::{BearerTokenCache, DefaultCredential};
//! use std::sync::Arc;
//!
//! # async {
//! let cache = Arc::new(BearerTokenCache::new(Arc::new(DefaultCredential::from_env())));
//! let token = cache.get_token("https://dynamicsessions.io/.default").await?;
//! # Ok::<(), agentlab::auth::AuthenticationError>(())
//! # };
//! ```

pub mod credentials;
pub mod token_cache;

pub use credentials::{AzureCliCredential, ClientSecretCredential, DefaultCredential};
pub use token_cache::{BearerTokenCache, BearerTokenProvider};

use async_trait::async_trait;
use std::error::Error;
use std::fmt;

/// A bearer token together with its expiry, as issued by an identity provider.
#[derive(Clone, Debug, PartialEq)]
pub struct AccessToken {
    /// The raw bearer token value.
    pub token: String,
    /// Expiry as a UTC unix timestamp in seconds.
    pub expires_on: i64,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_on: i64) -> Self {
        Self {
            token: token.into(),
            expires_on,
        }
    }

    /// A token is usable only while `now < expires_on`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires_on
    }
}

/// The identity provider rejected a token request or could not issue a token.
///
/// `messages` carries every diagnostic the provider (or each link of a credential
/// chain) supplied, in the order they were produced.
#[derive(Clone, Debug)]
pub struct AuthenticationError {
    pub credential: String,
    pub messages: Vec<String>,
}

impl AuthenticationError {
    pub fn new(credential: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            credential: credential.into(),
            messages: vec![message.into()],
        }
    }

    pub fn with_messages(credential: impl Into<String>, messages: Vec<String>) -> Self {
        Self {
            credential: credential.into(),
            messages,
        }
    }
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Authentication failed ({}): failed to retrieve the client auth token with messages: {}",
            self.credential,
            self.messages.join(" ")
        )
    }
}

impl Error for AuthenticationError {}

/// Something that can obtain an [`AccessToken`] for a scope.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Request a fresh token for `scope` (e.g. `https://dynamicsessions.io/.default`).
    async fn get_token(&self, scope: &str) -> Result<AccessToken, AuthenticationError>;

    /// Short name used in logs and error messages.
    fn credential_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_expiry_boundary() {
        let token = AccessToken::new("abc", 1_000);
        assert!(!token.is_expired_at(999));
        assert!(token.is_expired_at(1_000));
        assert!(token.is_expired_at(1_001));
    }

    #[test]
    fn test_authentication_error_lists_provider_messages() {
        let err = AuthenticationError::with_messages(
            "ClientSecretCredential",
            vec!["AADSTS7000215: Invalid client secret.".into(), "Trace ID: 42".into()],
        );
        let text = err.to_string();
        assert!(text.starts_with("Authentication failed (ClientSecretCredential)"));
        assert!(text.contains("AADSTS7000215: Invalid client secret. Trace ID: 42"));
    }
}
