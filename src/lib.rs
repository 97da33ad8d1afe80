//! # agentlab
//!
//! agentlab wires LLM agents to Azure. It talks to Azure OpenAI chat deployments,
//! gives agents descriptions and native tool functions, runs round-robin group
//! chats (optionally with a human in the loop), and sends generated Python to an
//! Azure Container Apps dynamic sessions pool for sandboxed execution.
//!
//! The crate is organised in layers:
//!
//! * **Clients**: the [`ClientWrapper`] trait and its Azure OpenAI implementation
//!   ([`clients::azure_openai::AzureOpenAIClient`]), authenticated with an API key
//!   or with an Entra ID bearer token.
//! * **Credentials**: [`auth::TokenCredential`] implementations and the
//!   scope-keyed [`auth::BearerTokenCache`].
//! * **Agents and tools**: [`Agent`] plus the [`tool_protocol::ToolRegistry`] it
//!   calls tools through, with [`tools::CalculatorPlugin`] and
//!   [`tools::TimePlugin`] built in.
//! * **Group chat**: [`orchestration::RoundRobinGroupChat`] over any
//!   [`orchestration::Participant`], including the human-backed
//!   [`orchestration::UserProxy`].
//! * **Remote execution**: [`code_blocks::extract_markdown_code_blocks`] finds the
//!   code, [`remote_executor::RemoteCodeExecutor`] runs it block by block (stopping
//!   at the first failure) through a [`sessions::CodeInterpreter`], and
//!   [`coding_session::CodingSession`] ties it all into a two-agent loop.
//!
//! ## Running code remotely
//!
//! ```rust,no_run
//! use agentlab::auth::DefaultCredential;
//! use agentlab::code_blocks::extract_markdown_code_blocks;
//! use agentlab::remote_executor::RemoteCodeExecutor;
//! use agentlab::AgentLabConfig;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     agentlab::init_logger();
//!     let config = AgentLabConfig::from_env();
//!     let executor =
//!         RemoteCodeExecutor::from_config(&config, Arc::new(DefaultCredential::from_env()));
//!
//!     let reply = "Here you go:\n```python\nprint(sum(range(10)))\n```";
//!     let result = executor
//!         .execute_code_blocks(&extract_markdown_code_blocks(reply))
//!         .await;
//!     println!("exit code {}\n{}", result.exit_code, result.output);
//! }
//! ```
//!
//! ## Configuration
//!
//! Everything configurable lives in [`AgentLabConfig`], read from the environment
//! (and an optional `.env` file) by [`AgentLabConfig::from_env`]:
//!
//! | variable | meaning |
//! |---|---|
//! | `AZURE_OPENAI_URL` | Azure OpenAI resource endpoint |
//! | `AZURE_OPENAI_DEPLOYMENT` | chat deployment (default `gpt-4o`) |
//! | `AZURE_OPENAI_API_VERSION` | API version (default `2024-06-01`) |
//! | `AZURE_OPENAI_API_KEY` | API key; bearer tokens are used when unset |
//! | `ACA_POOL_MANAGEMENT_ENDPOINT` | dynamic sessions pool endpoint |
//! | `ACA_EXECUTION_TIMEOUT_SECS` | per-request execution timeout (default 60) |

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// Applications embedding agentlab can opt in to `RUST_LOG` driven diagnostics
/// without picking a logging backend up front.
///
/// ```rust
/// agentlab::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::init();
    });
}

// Import the top-level `agentlab` module.
pub mod agentlab;

// Re-exporting key items for easier external access.
pub use agentlab::agent::{Agent, AgentResponse, AgentThread};
pub use agentlab::auth;
pub use agentlab::chat;
pub use agentlab::client_wrapper;
pub use agentlab::client_wrapper::{ClientWrapper, Message, Role, TokenUsage};
pub use agentlab::clients;
pub use agentlab::code_blocks;
pub use agentlab::code_blocks::{extract_markdown_code_blocks, CodeBlock};
pub use agentlab::coding_session;
pub use agentlab::config::AgentLabConfig;
pub use agentlab::orchestration;
pub use agentlab::remote_executor;
pub use agentlab::remote_executor::{ExecutionResult, RemoteCodeExecutor};
pub use agentlab::sessions;
pub use agentlab::tool_protocol;
pub use agentlab::tool_protocols;
pub use agentlab::tools;
pub use agentlab::{agent, config};
