//! Round-robin group chat.
//!
//! A [`RoundRobinGroupChat`] owns an ordered list of [`Participant`]s and a shared
//! [`ChatHistory`]. Each turn the next participant (in insertion order, wrapping
//! around) reads the history and appends one message. The chat stops as soon as
//! one of its [`TerminationCondition`]s holds.
//!
//! Participants are either [`Agent`]s or a [`UserProxy`] that asks a human.
//!
//! # Example
//!
//! ```rust,no_run
//! use agentlab::orchestration::{Participant, RoundRobinGroupChat, TerminationCondition, UserProxy};
//! use agentlab::clients::azure_openai::{AzureAuth, AzureOpenAIClient};
//! use agentlab::{Agent, AgentLabConfig};
//! use std::sync::Arc;
//!
//! # async {
//! let config = AgentLabConfig::from_env();
//! let client = Arc::new(AzureOpenAIClient::from_config(&config, AzureAuth::ApiKey("...".into())));
//!
//! let assistant: Arc<dyn Participant> = Arc::new(Agent::new("assistant", client));
//! let user_proxy: Arc<dyn Participant> = Arc::new(UserProxy::stdin("user_proxy"));
//!
//! let mut team = RoundRobinGroupChat::new(vec![assistant, user_proxy])?
//!     .with_termination(TerminationCondition::TextMention("APPROVE".into()));
//!
//! let result = team.run("Write a haiku about Rust.").await?;
//! println!("stopped: {}", result.stop_reason);
//! # Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
//! # };
//! ```

use crate::agentlab::agent::Agent;
use crate::agentlab::chat::{ChatEntry, ChatHistory, ChatMessage};
use async_trait::async_trait;
use std::collections::HashSet;
use std::error::Error;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Anything that can take a turn in a group chat.
#[async_trait]
pub trait Participant: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Produce this participant's next message given everything said so far.
    async fn respond(&self, history: &ChatHistory) -> Result<String, Box<dyn Error + Send + Sync>>;
}

#[async_trait]
impl Participant for Agent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn respond(&self, history: &ChatHistory) -> Result<String, Box<dyn Error + Send + Sync>> {
        Ok(Agent::respond(self, history).await?.content)
    }
}

pub type InputFn =
    Arc<dyn Fn(&str) -> Result<String, Box<dyn Error + Send + Sync>> + Send + Sync>;

pub const USER_PROXY_PROMPT: &str = "Enter your response: ";

/// A participant whose messages are typed by a human.
pub struct UserProxy {
    name: String,
    description: String,
    input: InputFn,
}

impl UserProxy {
    /// Read each reply as one line from standard input.
    pub fn stdin(name: impl Into<String>) -> Self {
        Self::with_input(name, Arc::new(read_stdin_line))
    }

    /// Ask `input` for each reply; it receives the prompt text.
    pub fn with_input(name: impl Into<String>, input: InputFn) -> Self {
        Self {
            name: name.into(),
            description: "A human user".to_string(),
            input,
        }
    }
}

fn read_stdin_line(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut stdout = io::stdout();
    stdout.write_all(prompt.as_bytes())?;
    stdout.flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Err(Box::new(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "standard input closed",
        )));
    }
    Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
}

#[async_trait]
impl Participant for UserProxy {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn respond(&self, _history: &ChatHistory) -> Result<String, Box<dyn Error + Send + Sync>> {
        let input = self.input.clone();
        // Blocking reads must not stall the runtime.
        tokio::task::spawn_blocking(move || input(USER_PROXY_PROMPT))
            .await
            .map_err(|e| Box::new(e) as Box<dyn Error + Send + Sync>)?
    }
}

/// When a group chat should stop. Conditions only look at messages produced
/// after the task was posted.
#[derive(Debug, Clone, PartialEq)]
pub enum TerminationCondition {
    /// The newest message contains this text.
    TextMention(String),
    /// This many messages have been produced.
    MaxMessages(usize),
}

impl TerminationCondition {
    /// `Some(reason)` when the chat should stop.
    pub fn check<E: ChatEntry>(&self, produced: &[E]) -> Option<String> {
        match self {
            TerminationCondition::TextMention(text) => {
                let last = produced.last()?;
                if last.content().contains(text.as_str()) {
                    Some(format!("Text '{}' mentioned by {}", text, last.name()))
                } else {
                    None
                }
            }
            TerminationCondition::MaxMessages(max) => {
                if produced.len() >= *max {
                    Some(format!("Maximum number of messages {} reached", max))
                } else {
                    None
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum OrchestrationError {
    /// The chat was built without participants.
    NoParticipants,
    /// Two participants share a name.
    DuplicateParticipant(String),
    /// `run` was called without any termination condition.
    Unbounded,
    /// A participant failed to produce its message.
    ParticipantFailed { name: String, message: String },
}

impl fmt::Display for OrchestrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestrationError::NoParticipants => write!(f, "No participants in group chat"),
            OrchestrationError::DuplicateParticipant(name) => {
                write!(f, "Duplicate participant name: {}", name)
            }
            OrchestrationError::Unbounded => {
                write!(f, "Group chat has no termination condition")
            }
            OrchestrationError::ParticipantFailed { name, message } => {
                write!(f, "Participant {} failed: {}", name, message)
            }
        }
    }
}

impl Error for OrchestrationError {}

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct GroupChatResult {
    /// Task message followed by every participant message, in order.
    pub messages: Vec<ChatMessage>,
    pub stop_reason: String,
}

pub struct RoundRobinGroupChat {
    participants: Vec<Arc<dyn Participant>>,
    conditions: Vec<TerminationCondition>,
    history: ChatHistory,
    next_speaker: usize,
    // index of the first message produced after the task
    produced_from: usize,
    stop_reason: Option<String>,
}

impl RoundRobinGroupChat {
    pub fn new(participants: Vec<Arc<dyn Participant>>) -> Result<Self, OrchestrationError> {
        if participants.is_empty() {
            return Err(OrchestrationError::NoParticipants);
        }
        let mut seen = HashSet::new();
        for p in &participants {
            if !seen.insert(p.name().to_string()) {
                return Err(OrchestrationError::DuplicateParticipant(p.name().to_string()));
            }
        }
        Ok(Self {
            participants,
            conditions: Vec::new(),
            history: ChatHistory::new(),
            next_speaker: 0,
            produced_from: 0,
            stop_reason: None,
        })
    }

    pub fn with_termination(mut self, condition: TerminationCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Seed the shared history (e.g. a team-wide system message) before the task.
    pub fn with_history(mut self, history: ChatHistory) -> Self {
        self.history = history;
        self
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn participant_names(&self) -> Vec<&str> {
        self.participants.iter().map(|p| p.name()).collect()
    }

    pub fn stop_reason(&self) -> Option<&str> {
        self.stop_reason.as_deref()
    }

    /// Post the task as a user message and reset the turn order.
    pub fn start(&mut self, task: &str) {
        self.history.add_user_message(task);
        self.produced_from = self.history.len();
        self.next_speaker = 0;
        self.stop_reason = None;
    }

    /// Let the next participant speak. Returns `None` once a termination condition
    /// holds; the reason is then available from [`stop_reason`](Self::stop_reason).
    pub async fn next_message(&mut self) -> Result<Option<ChatMessage>, OrchestrationError> {
        if self.check_termination() {
            return Ok(None);
        }

        let speaker = self.participants[self.next_speaker].clone();
        self.next_speaker = (self.next_speaker + 1) % self.participants.len();

        let content = speaker.respond(&self.history).await.map_err(|e| {
            log::error!(
                "RoundRobinGroupChat::next_message(...): {} failed: {}",
                speaker.name(),
                e
            );
            OrchestrationError::ParticipantFailed {
                name: speaker.name().to_string(),
                message: e.to_string(),
            }
        })?;

        let message = ChatMessage::from_participant(speaker.name(), content);
        log::info!("RoundRobinGroupChat::next_message(...): {} spoke", speaker.name());
        self.history.push(message.clone());
        Ok(Some(message))
    }

    /// Post `task` and take turns until a termination condition holds.
    pub async fn run(&mut self, task: &str) -> Result<GroupChatResult, OrchestrationError> {
        if self.conditions.is_empty() {
            return Err(OrchestrationError::Unbounded);
        }
        self.start(task);
        let task_index = self.produced_from - 1;

        while self.next_message().await?.is_some() {}

        Ok(GroupChatResult {
            messages: self.history.messages()[task_index..].to_vec(),
            stop_reason: self.stop_reason.clone().unwrap_or_default(),
        })
    }

    fn check_termination(&mut self) -> bool {
        if self.stop_reason.is_some() {
            return true;
        }
        let produced = &self.history.messages()[self.produced_from..];
        let reason = self.conditions.iter().find_map(|c| c.check(produced));
        if let Some(reason) = reason {
            log::info!("RoundRobinGroupChat: stopping, {}", reason);
            self.stop_reason = Some(reason);
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted(&'static str);

    #[async_trait]
    impl Participant for Scripted {
        fn name(&self) -> &str {
            self.0
        }

        async fn respond(&self, history: &ChatHistory) -> Result<String, Box<dyn Error + Send + Sync>> {
            Ok(format!("{} saw {}", self.0, history.len()))
        }
    }

    fn scripted(name: &'static str) -> Arc<dyn Participant> {
        Arc::new(Scripted(name))
    }

    #[test]
    fn test_rejects_bad_configuration() {
        assert!(matches!(
            RoundRobinGroupChat::new(vec![]),
            Err(OrchestrationError::NoParticipants)
        ));
        let dup = RoundRobinGroupChat::new(vec![scripted("a"), scripted("a")]);
        assert!(matches!(dup, Err(OrchestrationError::DuplicateParticipant(n)) if n == "a"));
    }

    #[tokio::test]
    async fn test_run_without_termination_is_refused() {
        let mut chat = RoundRobinGroupChat::new(vec![scripted("a")]).unwrap();
        assert!(matches!(chat.run("go").await, Err(OrchestrationError::Unbounded)));
    }

    #[test]
    fn test_text_mention_looks_at_newest_message_only() {
        let cond = TerminationCondition::TextMention("APPROVE".into());
        let msgs = vec![
            ChatMessage::from_participant("user_proxy", "APPROVE"),
            ChatMessage::from_participant("assistant", "revised"),
        ];
        assert_eq!(cond.check(&msgs), None);
        assert!(cond.check(&msgs[..1]).is_some());
        assert_eq!(cond.check::<ChatMessage>(&[]), None);
    }
}
