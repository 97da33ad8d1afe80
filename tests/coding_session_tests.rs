use agentlab::chat::{ChatHistory, ChatMessage};
use agentlab::client_wrapper::{ClientWrapper, Message, Role};
use agentlab::coding_session::{
    CodingSession, SessionOutcome, ASSISTANT_NAME, EXECUTOR_NAME, TEAM_SYSTEM_MESSAGE,
};
use agentlab::orchestration::Participant;
use agentlab::sessions::{CodeInterpreter, ExecutionError};
use agentlab::{ExecutionResult, RemoteCodeExecutor};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Runs nothing; answers from a queue of outcomes and remembers what it got.
struct QueuedInterpreter {
    outcomes: Mutex<VecDeque<Result<String, ExecutionError>>>,
    executed: Mutex<Vec<String>>,
}

impl QueuedInterpreter {
    fn new(outcomes: Vec<Result<String, ExecutionError>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            executed: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl CodeInterpreter for QueuedInterpreter {
    async fn execute_code(&self, code: &str) -> Result<String, ExecutionError> {
        self.executed.lock().unwrap().push(code.to_string());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("Status:\nSuccess".to_string()))
    }
}

/// Says the same thing every turn.
struct Parrot {
    name: &'static str,
    line: &'static str,
    turns: AtomicUsize,
}

impl Parrot {
    fn new(name: &'static str, line: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            line,
            turns: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Participant for Parrot {
    fn name(&self) -> &str {
        self.name
    }

    async fn respond(&self, _history: &ChatHistory) -> Result<String, Box<dyn Error + Send + Sync>> {
        self.turns.fetch_add(1, Ordering::SeqCst);
        Ok(self.line.to_string())
    }
}

/// Chat client shared by both agents; replies are handed out in call order.
struct SharedScript {
    replies: Mutex<VecDeque<&'static str>>,
    first_request: Mutex<Option<Vec<Message>>>,
}

#[async_trait]
impl ClientWrapper for SharedScript {
    fn model_name(&self) -> &str {
        "shared"
    }

    async fn send_message(
        &self,
        messages: &[Message],
    ) -> Result<Message, Box<dyn Error + Send + Sync>> {
        {
            let mut first = self.first_request.lock().unwrap();
            if first.is_none() {
                *first = Some(messages.to_vec());
            }
        }
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or("Nothing more to add.");
        Ok(Message::new(Role::Assistant, reply))
    }
}

const FIB_REPLY: &str = "Here is the code:\n```python\ndef fib(n):\n    a, b = 0, 1\n    for _ in range(n):\n        a, b = b, a + b\n    return a\nprint(fib(14))\n```\n@RemoteExecutor please run it.";

#[tokio::test]
async fn test_successful_execution_ends_the_session() {
    let interpreter = QueuedInterpreter::new(vec![Ok("Status:\nSuccess\nStdout:\n377\n".into())]);
    let coder = Parrot::new(ASSISTANT_NAME, FIB_REPLY);
    let reviewer = Parrot::new(EXECUTOR_NAME, "Executing now.");

    let executions = Arc::new(AtomicUsize::new(0));
    let counted = executions.clone();
    let session = CodingSession::with_participants(
        coder.clone(),
        reviewer.clone(),
        RemoteCodeExecutor::new(interpreter.clone()),
    )
    .on_execution(Box::new(move |result: &ExecutionResult| {
        assert_eq!(result.exit_code, 0);
        counted.fetch_add(1, Ordering::SeqCst);
    }));

    let report = session
        .run("Write Python code to calculate the 14th Fibonacci number.")
        .await
        .unwrap();

    assert_eq!(report.outcome, SessionOutcome::Succeeded);
    assert_eq!(report.transcript.len(), 2);
    assert_eq!(report.transcript[1].name, ASSISTANT_NAME);
    assert!(report.execution.unwrap().output.contains("377"));
    assert_eq!(executions.load(Ordering::SeqCst), 1);
    assert_eq!(reviewer.turns.load(Ordering::SeqCst), 0);
    assert!(interpreter.executed.lock().unwrap()[0].starts_with("def fib(n):"));
}

#[tokio::test]
async fn test_failed_execution_is_not_retried() {
    let interpreter = QueuedInterpreter::new(vec![Err(ExecutionError::Transport(
        "connection reset".into(),
    ))]);
    let coder = Parrot::new(ASSISTANT_NAME, FIB_REPLY);
    let reviewer = Parrot::new(EXECUTOR_NAME, "That failed.");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let session = CodingSession::with_participants(
        coder.clone(),
        reviewer,
        RemoteCodeExecutor::new(interpreter.clone()),
    )
    .on_message(Box::new(move |message: &ChatMessage| {
        log.lock().unwrap().push(message.name.clone());
    }));

    let report = session.run("fib(14)").await.unwrap();

    assert_eq!(report.outcome, SessionOutcome::ExecutionFailed);
    let execution = report.execution.unwrap();
    assert_eq!(execution.exit_code, 1);
    assert!(execution
        .output
        .contains("Error executing code block 1: Request failed: connection reset"));
    // the default limit of six messages is reached; the code runs once
    assert_eq!(report.transcript.len(), 7);
    assert_eq!(coder.turns.load(Ordering::SeqCst), 3);
    assert_eq!(interpreter.executed.lock().unwrap().len(), 1);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            ASSISTANT_NAME,
            EXECUTOR_NAME,
            ASSISTANT_NAME,
            EXECUTOR_NAME,
            ASSISTANT_NAME,
            EXECUTOR_NAME
        ]
    );
}

#[tokio::test]
async fn test_no_code_reaches_the_message_limit() {
    let interpreter = QueuedInterpreter::new(Vec::new());
    let coder = Parrot::new(ASSISTANT_NAME, "I would rather talk about it first.");
    let reviewer = Parrot::new(EXECUTOR_NAME, "```python\nprint('not mine to run')\n```");

    let session = CodingSession::with_participants(
        coder,
        reviewer,
        RemoteCodeExecutor::new(interpreter.clone()),
    )
    .with_max_messages(4);

    let report = session.run("fib(14)").await.unwrap();

    assert_eq!(report.outcome, SessionOutcome::NoCodeProduced);
    assert!(report.execution.is_none());
    assert_eq!(report.transcript.len(), 5);
    assert!(interpreter.executed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_default_agents_share_the_team_history() {
    let client = Arc::new(SharedScript {
        replies: Mutex::new(vec![FIB_REPLY].into_iter().collect()),
        first_request: Mutex::new(None),
    });
    let interpreter = QueuedInterpreter::new(Vec::new());
    let session = CodingSession::new(client.clone(), RemoteCodeExecutor::new(interpreter.clone()));

    let report = session.run("Calculate fib(14).").await.unwrap();

    assert_eq!(report.outcome, SessionOutcome::Succeeded);
    assert_eq!(report.transcript[0].content, "Calculate fib(14).");

    let first = client.first_request.lock().unwrap().clone().unwrap();
    assert!(first[0].content.contains("You are Assistant."));
    assert!(first[0].content.contains("Python Code Generation Assistant"));
    assert_eq!(first[1].role, Role::System);
    assert_eq!(&*first[1].content, TEAM_SYSTEM_MESSAGE);
    assert_eq!(&*first[2].content, "[user]: Calculate fib(14).");
}
