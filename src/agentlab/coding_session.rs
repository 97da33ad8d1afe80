//! Two-agent coding session with remote execution.
//!
//! An `Assistant` agent writes Python in fenced blocks and a `RemoteExecutor`
//! agent reports on it, taking turns in a [`RoundRobinGroupChat`]. The first
//! Assistant message that contains a fence is extracted and run through a
//! [`RemoteCodeExecutor`]. A successful run ends the session; otherwise the chat
//! continues until the message limit.

use crate::agentlab::agent::Agent;
use crate::agentlab::chat::{ChatHistory, ChatMessage};
use crate::agentlab::client_wrapper::ClientWrapper;
use crate::agentlab::code_blocks::{contains_fence, extract_markdown_code_blocks};
use crate::agentlab::orchestration::{
    OrchestrationError, Participant, RoundRobinGroupChat, TerminationCondition,
};
use crate::agentlab::remote_executor::{ExecutionResult, RemoteCodeExecutor};
use std::sync::Arc;

pub const ASSISTANT_NAME: &str = "Assistant";
pub const EXECUTOR_NAME: &str = "RemoteExecutor";
pub const DEFAULT_MAX_MESSAGES: usize = 6;

pub const TEAM_SYSTEM_MESSAGE: &str = "You are a team working together to generate and execute Python code remotely. \
The Assistant will write code, and the RemoteExecutor will execute it in a secure remote environment.";

const ASSISTANT_DESCRIPTION: &str = "I am a Python Code Generation Assistant.
I write Python scripts in markdown code blocks that will be executed in a remote container.
I always save figures to file in the current directory and never use plt.show().
All code required to complete a task must be contained within a single response.
When asked to write code, I provide it in properly formatted markdown code blocks.
I ask @RemoteExecutor to execute the code after I provide it.";

const EXECUTOR_DESCRIPTION: &str = "I am a Remote Code Execution Agent.
I execute Python code in a remote Azure Container Apps instance for secure execution.
When I receive code blocks in markdown format, I extract them and execute them remotely.
I always report the execution results including any output or errors.
I focus on executing code and providing execution results.";

/// The code-writing agent.
pub fn assistant_agent(client: Arc<dyn ClientWrapper>) -> Agent {
    Agent::new(ASSISTANT_NAME, client).with_description(ASSISTANT_DESCRIPTION)
}

/// The agent that speaks for the remote runtime.
pub fn remote_executor_agent(client: Arc<dyn ClientWrapper>) -> Agent {
    Agent::new(EXECUTOR_NAME, client).with_description(EXECUTOR_DESCRIPTION)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Code ran remotely with exit code 0.
    Succeeded,
    /// Code ran remotely and failed; the chat went on to the message limit.
    ExecutionFailed,
    /// The message limit was reached before the coder produced any code.
    NoCodeProduced,
}

#[derive(Debug, Clone)]
pub struct CodingSessionReport {
    /// Task message followed by every participant message.
    pub transcript: Vec<ChatMessage>,
    pub execution: Option<ExecutionResult>,
    pub outcome: SessionOutcome,
}

pub type MessageObserver = Box<dyn Fn(&ChatMessage) + Send + Sync>;
pub type ExecutionObserver = Box<dyn Fn(&ExecutionResult) + Send + Sync>;

pub struct CodingSession {
    coder: Arc<dyn Participant>,
    reviewer: Arc<dyn Participant>,
    executor: RemoteCodeExecutor,
    max_messages: usize,
    on_message: Option<MessageObserver>,
    on_execution: Option<ExecutionObserver>,
}

impl CodingSession {
    /// The standard Assistant + RemoteExecutor pair sharing one chat client.
    pub fn new(client: Arc<dyn ClientWrapper>, executor: RemoteCodeExecutor) -> Self {
        Self::with_participants(
            Arc::new(assistant_agent(client.clone())),
            Arc::new(remote_executor_agent(client)),
            executor,
        )
    }

    /// `coder` speaks first and is the only participant whose code gets executed.
    pub fn with_participants(
        coder: Arc<dyn Participant>,
        reviewer: Arc<dyn Participant>,
        executor: RemoteCodeExecutor,
    ) -> Self {
        Self {
            coder,
            reviewer,
            executor,
            max_messages: DEFAULT_MAX_MESSAGES,
            on_message: None,
            on_execution: None,
        }
    }

    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = max_messages;
        self
    }

    /// Called with every message as soon as it is produced.
    pub fn on_message(mut self, observer: MessageObserver) -> Self {
        self.on_message = Some(observer);
        self
    }

    /// Called with the remote execution result.
    pub fn on_execution(mut self, observer: ExecutionObserver) -> Self {
        self.on_execution = Some(observer);
        self
    }

    pub async fn run(&self, request: &str) -> Result<CodingSessionReport, OrchestrationError> {
        let mut seed = ChatHistory::new();
        seed.add_system_message(TEAM_SYSTEM_MESSAGE);

        let mut chat = RoundRobinGroupChat::new(vec![self.coder.clone(), self.reviewer.clone()])?
            .with_history(seed)
            .with_termination(TerminationCondition::MaxMessages(self.max_messages));
        chat.start(request);
        let task_index = chat.history().len() - 1;

        log::info!(
            "CodingSession::run(...): starting remote coding session ({} messages max)",
            self.max_messages
        );

        let mut execution: Option<ExecutionResult> = None;
        while let Some(message) = chat.next_message().await? {
            if let Some(observer) = &self.on_message {
                observer(&message);
            }

            if execution.is_some()
                || message.name != self.coder.name()
                || !contains_fence(&message.content)
            {
                continue;
            }
            let blocks = extract_markdown_code_blocks(&message.content);
            if blocks.is_empty() {
                continue;
            }

            log::info!(
                "CodingSession::run(...): executing {} code block(s) remotely",
                blocks.len()
            );
            let result = self.executor.execute_code_blocks(&blocks).await;
            if let Some(observer) = &self.on_execution {
                observer(&result);
            }
            let succeeded = result.is_success();
            execution = Some(result);
            if succeeded {
                break;
            }
        }

        let outcome = match &execution {
            Some(result) if result.is_success() => SessionOutcome::Succeeded,
            Some(_) => SessionOutcome::ExecutionFailed,
            None => SessionOutcome::NoCodeProduced,
        };
        log::info!("CodingSession::run(...): finished with {:?}", outcome);

        Ok(CodingSessionReport {
            transcript: chat.history().messages()[task_index..].to_vec(),
            execution,
            outcome,
        })
    }
}
