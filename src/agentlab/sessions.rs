//! Client for Azure Container Apps dynamic sessions (Python code interpreter pools).
//!
//! A [`SessionsPythonClient`] owns one session identifier for its whole lifetime, so
//! variables, imports and files created by one call stay visible to the next.
//!
//! ```rust,no_run
//! use agentlab::auth::{BearerTokenCache, BearerTokenProvider, DefaultCredential};
//! use agentlab::sessions::{CodeInterpreter, SessionsPythonClient, SESSIONS_SCOPE};
//! use std::sync::Arc;
//!
//! # async {
//! let cache = Arc::new(BearerTokenCache::new(Arc::new(DefaultCredential::from_env())));
//! let client = SessionsPythonClient::new(
//!     Some("https://eastus.dynamicsessions.io/subscriptions/.../sessionPools/pool".into()),
//!     BearerTokenProvider::new(cache, SESSIONS_SCOPE),
//! );
//! client.connect().await?;
//! println!("{}", client.execute_code("print(6 * 7)").await?);
//! # Ok::<(), agentlab::sessions::ExecutionError>(())
//! # };
//! ```

use crate::agentlab::auth::{AuthenticationError, BearerTokenProvider};
use crate::agentlab::clients::http_pool::{base_url_of, get_or_create_client};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::time::Duration;

pub const SESSIONS_API_VERSION: &str = "2024-02-02-preview";
pub const SESSIONS_SCOPE: &str = "https://dynamicsessions.io/.default";
const USER_AGENT: &str = concat!("agentlab/", env!("CARGO_PKG_VERSION"), " (sessions-python)");

static LEADING_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s|`)*(?:(?i:python)(?:\s|$))?\s*").unwrap());
static TRAILING_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\s|`)*$").unwrap());

/// Failure talking to a code interpreter.
#[derive(Debug)]
pub enum ExecutionError {
    /// No token could be obtained for the interpreter's scope.
    Authentication(AuthenticationError),
    /// The interpreter endpoint is missing from configuration.
    NotConfigured(String),
    /// The request never produced an HTTP response (DNS, TLS, timeout, ...).
    Transport(String),
    /// The endpoint answered with a non-success status.
    Status { status: u16, body: String },
    /// The endpoint answered with a body we could not decode.
    Decode(String),
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::Authentication(err) => write!(f, "{}", err),
            ExecutionError::NotConfigured(what) => write!(f, "Not configured: {}", what),
            ExecutionError::Transport(msg) => write!(f, "Request failed: {}", msg),
            ExecutionError::Status { status, body } => {
                write!(f, "Code execution endpoint returned {}: {}", status, body)
            }
            ExecutionError::Decode(msg) => write!(f, "Unreadable execution response: {}", msg),
        }
    }
}

impl Error for ExecutionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ExecutionError::Authentication(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AuthenticationError> for ExecutionError {
    fn from(err: AuthenticationError) -> Self {
        ExecutionError::Authentication(err)
    }
}

/// Anything that can run a piece of source text and describe the outcome.
#[async_trait]
pub trait CodeInterpreter: Send + Sync {
    /// Check that the interpreter is reachable in principle (configured, credentials
    /// available). Called once before a batch; the default has nothing to check.
    async fn connect(&self) -> Result<(), ExecutionError> {
        Ok(())
    }

    /// Run `code` and return the stringified outcome.
    async fn execute_code(&self, code: &str) -> Result<String, ExecutionError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteProperties<'a> {
    code_input_type: &'a str,
    execution_type: &'a str,
    code: &'a str,
}

#[derive(Serialize)]
struct ExecuteRequest<'a> {
    properties: ExecuteProperties<'a>,
}

#[derive(Deserialize)]
struct ExecuteResponse {
    properties: SessionsExecutionResult,
}

/// Decoded outcome of one remote execution.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionsExecutionResult {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(rename = "executionTimeInMilliseconds", default)]
    pub execution_time_ms: u64,
}

impl fmt::Display for SessionsExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = match &self.result {
            serde_json::Value::Null => String::new(),
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        write!(
            f,
            "Status:\n{}\nResult:\n{}\nStdout:\n{}\nStderr:\n{}",
            self.status, result, self.stdout, self.stderr
        )
    }
}

/// Strip surrounding whitespace, backticks and a leading `python` tag.
///
/// ```rust
/// use agentlab::sessions::sanitize_input;
///
/// assert_eq!(sanitize_input("```python\nprint(1)\n```"), "print(1)");
/// ```
pub fn sanitize_input(code: &str) -> String {
    let code = LEADING_NOISE.replace(code, "");
    TRAILING_NOISE.replace(&code, "").into_owned()
}

/// Python code interpreter backed by a dynamic sessions pool.
pub struct SessionsPythonClient {
    pool_management_endpoint: Option<String>,
    token_provider: BearerTokenProvider,
    session_id: String,
    timeout: Duration,
    sanitize: bool,
}

impl SessionsPythonClient {
    pub fn new(pool_management_endpoint: Option<String>, token_provider: BearerTokenProvider) -> Self {
        Self {
            pool_management_endpoint: pool_management_endpoint
                .map(|e| e.trim_end_matches('/').to_string())
                .filter(|e| !e.is_empty()),
            token_provider,
            session_id: uuid::Uuid::new_v4().to_string(),
            timeout: Duration::from_secs(60),
            sanitize: true,
        }
    }

    /// Per-request timeout handed to the HTTP transport.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_sanitize_input(mut self, sanitize: bool) -> Self {
        self.sanitize = sanitize;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn endpoint(&self) -> Result<&str, ExecutionError> {
        self.pool_management_endpoint.as_deref().ok_or_else(|| {
            ExecutionError::NotConfigured(
                "pool management endpoint (ACA_POOL_MANAGEMENT_ENDPOINT) is not set".to_string(),
            )
        })
    }

    fn execute_url(&self, endpoint: &str) -> String {
        format!(
            "{}/code/execute?api-version={}&identifier={}",
            endpoint, SESSIONS_API_VERSION, self.session_id
        )
    }
}

#[async_trait]
impl CodeInterpreter for SessionsPythonClient {
    async fn connect(&self) -> Result<(), ExecutionError> {
        self.endpoint()?;
        self.token_provider.get_token().await?;
        Ok(())
    }

    async fn execute_code(&self, code: &str) -> Result<String, ExecutionError> {
        let endpoint = self.endpoint()?;
        let token = self.token_provider.get_token().await?;
        let code = if self.sanitize {
            sanitize_input(code)
        } else {
            code.to_string()
        };

        let url = self.execute_url(endpoint);
        let body = ExecuteRequest {
            properties: ExecuteProperties {
                code_input_type: "inline",
                execution_type: "synchronous",
                code: &code,
            },
        };

        log::debug!(
            "SessionsPythonClient::execute_code(...): session {} <- {} bytes",
            self.session_id,
            code.len()
        );

        let response = get_or_create_client(base_url_of(&url))
            .post(&url)
            .bearer_auth(token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExecutionError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ExecutionError::Transport(e.to_string()))?;

        if !status.is_success() {
            log::error!(
                "SessionsPythonClient::execute_code(...): session {} got {}",
                self.session_id,
                status
            );
            return Err(ExecutionError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ExecuteResponse =
            serde_json::from_str(&text).map_err(|e| ExecutionError::Decode(e.to_string()))?;
        Ok(parsed.properties.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_fences_and_tag() {
        assert_eq!(sanitize_input("  ```Python\nx = 1\n```  \n"), "x = 1");
        assert_eq!(sanitize_input("print('python')"), "print('python')");
        assert_eq!(sanitize_input("python"), "");
    }

    #[test]
    fn test_sanitize_keeps_identifiers_starting_with_python() {
        assert_eq!(sanitize_input("python_version = 3"), "python_version = 3");
        assert_eq!(
            sanitize_input("```\npython_version = 3\nprint(python_version)\n```"),
            "python_version = 3\nprint(python_version)"
        );
    }

    #[test]
    fn test_execution_result_display() {
        let result = SessionsExecutionResult {
            status: "Success".into(),
            result: serde_json::json!(42),
            stdout: "hi\n".into(),
            stderr: String::new(),
            execution_time_ms: 12,
        };
        assert_eq!(
            result.to_string(),
            "Status:\nSuccess\nResult:\n42\nStdout:\nhi\n\nStderr:\n"
        );
    }

    #[test]
    fn test_decodes_service_payload() {
        let payload = r#"{"$id":"1","properties":{"$id":"2","status":"Success","stdout":"3\n","stderr":"","result":"","executionTimeInMilliseconds":5}}"#;
        let parsed: ExecuteResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed.properties.status, "Success");
        assert_eq!(parsed.properties.execution_time_ms, 5);
    }

    #[test]
    fn test_authentication_error_is_its_own_variant() {
        let err: ExecutionError = AuthenticationError::new("AzureCliCredential", "az login").into();
        assert!(matches!(err, ExecutionError::Authentication(_)));
        assert!(err.to_string().contains("Authentication failed"));
    }
}
