//! Shared conversation history for group chats.
//!
//! Every entry records who spoke and what was said. When a participant takes its
//! turn, [`ChatHistory::to_llm_messages`] renders the history from that
//! participant's point of view: its own messages become assistant messages and
//! everyone else's become user messages prefixed with `[name]: `.

use crate::agentlab::client_wrapper::{Message, Role};
use chrono::{DateTime, Utc};

/// Name recorded on messages typed by the human at the keyboard.
pub const USER_NAME: &str = "user";
/// Name recorded on system messages.
pub const SYSTEM_NAME: &str = "system";

/// The read-only view of a chat message that orchestration code relies on.
pub trait ChatEntry {
    fn name(&self) -> &str;
    fn content(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub timestamp: DateTime<Utc>,
    pub name: String,
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(name: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            name: name.into(),
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(SYSTEM_NAME, Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(USER_NAME, Role::User, content)
    }

    pub fn from_participant(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(name, Role::Assistant, content)
    }
}

impl ChatEntry for ChatMessage {
    fn name(&self) -> &str {
        &self.name
    }

    fn content(&self) -> &str {
        &self.content
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChatHistory {
    messages: Vec<ChatMessage>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn add_system_message(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::system(content));
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::user(content));
    }

    pub fn add_message(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.push(ChatMessage::from_participant(name, content));
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Render the history for the participant called `speaker`.
    pub fn to_llm_messages(&self, speaker: &str) -> Vec<Message> {
        self.messages
            .iter()
            .map(|m| match m.role {
                Role::System => Message::new(Role::System, &m.content),
                _ if m.name == speaker => Message::new(Role::Assistant, &m.content),
                _ => Message::new(Role::User, format!("[{}]: {}", m.name, m.content)),
            })
            .collect()
    }
}

/// Print each message as `name: content` under a `---` separator, the way the
/// demos show a transcript.
pub fn format_transcript<E: ChatEntry>(entries: &[E]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!("---\n{}: {}\n", entry.name(), entry.content()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_from_participant_view() {
        let mut history = ChatHistory::new();
        history.add_system_message("Team rules");
        history.add_user_message("Plot a sine wave");
        history.add_message("Assistant", "```python\nprint(1)\n```");
        history.add_message("RemoteExecutor", "exit 0");

        let view = history.to_llm_messages("Assistant");
        assert_eq!(view[0].role, Role::System);
        assert_eq!(&*view[1].content, "[user]: Plot a sine wave");
        assert_eq!(view[2].role, Role::Assistant);
        assert_eq!(&*view[3].content, "[RemoteExecutor]: exit 0");
    }

    #[test]
    fn test_format_transcript() {
        let messages = vec![ChatMessage::user("hi"), ChatMessage::from_participant("bot", "hello")];
        assert_eq!(format_transcript(&messages), "---\nuser: hi\n---\nbot: hello\n");
    }
}
