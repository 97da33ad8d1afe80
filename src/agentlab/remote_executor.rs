//! Sequential, fail-fast execution of code blocks in a remote interpreter.
//!
//! [`RemoteCodeExecutor::execute_code_blocks`] never returns an error: every
//! failure (missing endpoint, credentials, a block that blew up) is folded into the
//! [`ExecutionResult`] with exit code `1` and a human readable log.
//!
//! ```rust,no_run
//! use agentlab::auth::DefaultCredential;
//! use agentlab::code_blocks::extract_markdown_code_blocks;
//! use agentlab::remote_executor::RemoteCodeExecutor;
//! use agentlab::AgentLabConfig;
//! use std::sync::Arc;
//!
//! # async {
//! let config = AgentLabConfig::from_env();
//! let executor = RemoteCodeExecutor::from_config(&config, Arc::new(DefaultCredential::from_env()));
//!
//! let blocks = extract_markdown_code_blocks("```python\nprint('hello')\n```");
//! let result = executor.execute_code_blocks(&blocks).await;
//! println!("exit {}:\n{}", result.exit_code, result.output);
//! # };
//! ```

use crate::agentlab::auth::{BearerTokenCache, BearerTokenProvider, TokenCredential};
use crate::agentlab::code_blocks::CodeBlock;
use crate::agentlab::config::AgentLabConfig;
use crate::agentlab::sessions::{CodeInterpreter, ExecutionError, SessionsPythonClient};
use std::sync::Arc;

const AUTH_REQUIRED: &str = "Authentication required for remote execution. Please configure Azure credentials or run in a properly authenticated environment.";

/// Outcome of one batch: exit code `0` on success, `1` on any failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub output: String,
}

impl ExecutionResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            output: output.into(),
        }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            output: output.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs code blocks one at a time against a shared [`CodeInterpreter`].
pub struct RemoteCodeExecutor {
    interpreter: Arc<dyn CodeInterpreter>,
}

impl RemoteCodeExecutor {
    pub fn new(interpreter: Arc<dyn CodeInterpreter>) -> Self {
        Self { interpreter }
    }

    /// Dynamic sessions client built from `config`, authenticated through a token
    /// cache over `credential`.
    pub fn from_config(config: &AgentLabConfig, credential: Arc<dyn TokenCredential>) -> Self {
        let cache = Arc::new(BearerTokenCache::new(credential));
        let client = SessionsPythonClient::new(
            config.pool_management_endpoint.clone(),
            BearerTokenProvider::new(cache, config.sessions_scope.clone()),
        )
        .with_timeout(config.execution_timeout);
        Self::new(Arc::new(client))
    }

    pub fn interpreter(&self) -> &Arc<dyn CodeInterpreter> {
        &self.interpreter
    }

    /// Execute `blocks` in order, stopping at the first failure.
    pub async fn execute_code_blocks(&self, blocks: &[CodeBlock]) -> ExecutionResult {
        if blocks.is_empty() {
            return ExecutionResult::success("");
        }

        if let Err(err) = self.interpreter.connect().await {
            log::warn!(
                "RemoteCodeExecutor::execute_code_blocks(...): interpreter unavailable: {}",
                err
            );
            return ExecutionResult::failure(describe_setup_failure(&err));
        }

        let total = blocks.len();
        let mut logs: Vec<String> = Vec::with_capacity(total * 2);
        let mut exit_code = 0;

        for (i, block) in blocks.iter().enumerate() {
            let position = i + 1;
            logs.push(format!("\n--- Executing code block {}/{} ---\n", position, total));
            log::debug!(
                "RemoteCodeExecutor::execute_code_blocks(...): block {}/{} ({})",
                position,
                total,
                block.language
            );

            match self.interpreter.execute_code(&block.code).await {
                Ok(result) => logs.push(result),
                Err(err) => {
                    log::warn!(
                        "RemoteCodeExecutor::execute_code_blocks(...): block {} failed: {}",
                        position,
                        err
                    );
                    logs.push(format!("Error executing code block {}: {}\n", position, err));
                    exit_code = 1;
                    break;
                }
            }
        }

        ExecutionResult {
            exit_code,
            output: logs.concat(),
        }
    }
}

fn is_authentication_failure(err: &ExecutionError) -> bool {
    if matches!(err, ExecutionError::Authentication(_)) {
        return true;
    }
    let text = err.to_string();
    text.contains("DefaultCredential") || text.to_lowercase().contains("authentication")
}

fn describe_setup_failure(err: &ExecutionError) -> String {
    if is_authentication_failure(err) {
        format!("{}\nOriginal error: {}", AUTH_REQUIRED, err)
    } else {
        format!("Failed to execute code in remote container: {}", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agentlab::auth::AuthenticationError;

    #[test]
    fn test_setup_failure_classification() {
        let auth = ExecutionError::Authentication(AuthenticationError::new("X", "nope"));
        assert!(describe_setup_failure(&auth).starts_with("Authentication required"));

        let status = ExecutionError::Status {
            status: 401,
            body: "Authentication token is missing".into(),
        };
        assert!(describe_setup_failure(&status).contains("Original error: "));

        let missing = ExecutionError::NotConfigured("endpoint".into());
        assert_eq!(
            describe_setup_failure(&missing),
            "Failed to execute code in remote container: Not configured: endpoint"
        );
    }

    #[test]
    fn test_execution_result_constructors() {
        assert!(ExecutionResult::success("ok").is_success());
        assert_eq!(ExecutionResult::failure("x").exit_code, 1);
    }
}
