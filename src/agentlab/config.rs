//! Configuration for agentlab.
//!
//! [`AgentLabConfig`] is a plain value passed to the constructors that need it; no
//! module reads the environment behind your back. Build it by hand, from the
//! process environment with [`AgentLabConfig::from_env`], or from any key lookup
//! with [`AgentLabConfig::from_lookup`].
//!
//! # Example
//!
//! ```rust
//! use agentlab::AgentLabConfig;
//!
//! let config = AgentLabConfig::from_lookup(|key| match key {
//!     "AZURE_OPENAI_URL" => Some("https://myaoai.openai.azure.com".to_string()),
//!     _ => None,
//! });
//! assert_eq!(config.deployment_name, "gpt-4o");
//! assert!(config.pool_management_endpoint.is_none());
//! ```

use crate::agentlab::sessions::SESSIONS_SCOPE;
use std::time::Duration;

pub const DEFAULT_DEPLOYMENT: &str = "gpt-4o";
pub const DEFAULT_API_VERSION: &str = "2024-06-01";
pub const COGNITIVE_SERVICES_SCOPE: &str = "https://cognitiveservices.azure.com/.default";
pub const DEFAULT_EXECUTION_TIMEOUT_SECS: u64 = 60;

/// Endpoints, deployment and timeouts for the Azure services agentlab talks to.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentLabConfig {
    /// Azure OpenAI resource endpoint, e.g. `https://myaoai.openai.azure.com`.
    pub azure_openai_endpoint: String,
    pub deployment_name: String,
    pub api_version: String,
    /// When unset, chat clients authenticate with a bearer token instead.
    pub api_key: Option<String>,
    /// Dynamic sessions pool management endpoint.
    pub pool_management_endpoint: Option<String>,
    pub sessions_scope: String,
    pub cognitive_services_scope: String,
    /// Per-request timeout for remote code execution.
    pub execution_timeout: Duration,
}

impl Default for AgentLabConfig {
    fn default() -> Self {
        Self {
            azure_openai_endpoint: String::new(),
            deployment_name: DEFAULT_DEPLOYMENT.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            api_key: None,
            pool_management_endpoint: None,
            sessions_scope: SESSIONS_SCOPE.to_string(),
            cognitive_services_scope: COGNITIVE_SERVICES_SCOPE.to_string(),
            execution_timeout: Duration::from_secs(DEFAULT_EXECUTION_TIMEOUT_SECS),
        }
    }
}

impl AgentLabConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let azure_openai_endpoint = match get("AZURE_OPENAI_URL") {
            Some(url) => url,
            None => {
                log::warn!("AgentLabConfig::from_lookup(...): AZURE_OPENAI_URL is not set");
                String::new()
            }
        };

        let execution_timeout = match get("ACA_EXECUTION_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    log::warn!(
                        "AgentLabConfig::from_lookup(...): ignoring ACA_EXECUTION_TIMEOUT_SECS='{}'",
                        raw
                    );
                    defaults.execution_timeout
                }
            },
            None => defaults.execution_timeout,
        };

        Self {
            azure_openai_endpoint,
            deployment_name: get("AZURE_OPENAI_DEPLOYMENT").unwrap_or(defaults.deployment_name),
            api_version: get("AZURE_OPENAI_API_VERSION").unwrap_or(defaults.api_version),
            api_key: get("AZURE_OPENAI_API_KEY"),
            pool_management_endpoint: get("ACA_POOL_MANAGEMENT_ENDPOINT"),
            sessions_scope: defaults.sessions_scope,
            cognitive_services_scope: defaults.cognitive_services_scope,
            execution_timeout,
        }
    }
}
