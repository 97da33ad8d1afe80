//! Agent System
//!
//! An [`Agent`] is a named LLM persona: a chat client, a description of what it is
//! for, optional instructions, and optional tools. Agents are used either on their
//! own (with an [`AgentThread`] carrying the conversation between calls) or as
//! participants in a [`RoundRobinGroupChat`](crate::orchestration::RoundRobinGroupChat).
//!
//! Tools are offered to the model through a plain-text convention: the system
//! prompt lists the available tools and asks the model to answer with
//! `{"tool_call": {"name": "...", "parameters": {...}}}` when it wants one. The
//! agent runs the tool, feeds the result back and asks again, up to
//! `max_tool_iterations` times per turn.
//!
//! # Example
//!
//! ```rust,no_run
//! use agentlab::clients::azure_openai::{AzureAuth, AzureOpenAIClient};
//! use agentlab::tool_protocol::ToolRegistry;
//! use agentlab::tools::CalculatorPlugin;
//! use agentlab::{Agent, AgentLabConfig, AgentThread};
//! use std::sync::Arc;
//!
//! # async {
//! let config = AgentLabConfig::from_env();
//! let client = Arc::new(AzureOpenAIClient::from_config(&config, AzureAuth::ApiKey("...".into())));
//!
//! let mut tools = ToolRegistry::empty();
//! tools.add_protocol("math", Arc::new(CalculatorPlugin)).await?;
//!
//! let agent = Agent::new("MathAssistant", client)
//!     .with_instructions("For math you always call the 'calculate' function.")
//!     .with_tools(tools);
//!
//! let mut thread = AgentThread::new();
//! let reply = agent.get_response(&mut thread, "What is 6 times 7?").await?;
//! println!("{}", reply.content);
//! # Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
//! # };
//! ```

use crate::agentlab::chat::ChatHistory;
use crate::agentlab::client_wrapper::{ClientWrapper, Message, Role, TokenUsage};
use crate::agentlab::tool_protocol::ToolRegistry;
use std::error::Error;
use std::sync::Arc;

pub const DEFAULT_MAX_TOOL_ITERATIONS: usize = 5;

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub parameters: serde_json::Value,
}

/// Final text of a turn plus accounting across every model round-trip it took.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub content: String,
    pub tokens_used: Option<TokenUsage>,
    pub tool_calls_made: usize,
}

/// Conversation state of a single-agent exchange, kept between calls to
/// [`Agent::get_response`]. The system prompt is not stored; the agent adds it to
/// every request.
#[derive(Debug, Clone, Default)]
pub struct AgentThread {
    messages: Vec<Message>,
}

impl AgentThread {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

pub struct Agent {
    pub name: String,
    /// What the agent is for. Other participants see this too.
    pub description: String,
    pub instructions: Option<String>,
    client: Arc<dyn ClientWrapper>,
    tools: Arc<ToolRegistry>,
    max_tool_iterations: usize,
}

impl Agent {
    pub fn new(name: impl Into<String>, client: Arc<dyn ClientWrapper>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            instructions: None,
            client,
            tools: Arc::new(ToolRegistry::empty()),
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_tools(mut self, registry: ToolRegistry) -> Self {
        self.tools = Arc::new(registry);
        self
    }

    pub fn with_shared_tools(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.tools = registry;
        self
    }

    pub fn with_max_tool_iterations(mut self, max: usize) -> Self {
        self.max_tool_iterations = max;
        self
    }

    pub fn client(&self) -> &Arc<dyn ClientWrapper> {
        &self.client
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Identity, description, instructions and (when tools are present) the tool
    /// catalogue with the calling convention.
    pub fn system_prompt(&self) -> String {
        let mut prompt = format!("You are {}.\n", self.name);
        if !self.description.is_empty() {
            prompt.push_str(&self.description);
            prompt.push('\n');
        }
        if let Some(instructions) = &self.instructions {
            prompt.push('\n');
            prompt.push_str(instructions);
            prompt.push('\n');
        }

        if !self.tools.is_empty() {
            prompt.push_str("\nYou have access to the following tools:\n");
            for tool in self.tools.list_tools() {
                prompt.push_str(&tool.describe());
                prompt.push('\n');
            }
            prompt.push_str(
                "\nTo use a tool, respond with only a JSON object in the following format:\n\
                 {\"tool_call\": {\"name\": \"tool_name\", \"parameters\": {...}}}\n\
                 After the tool runs you will receive its result and can continue.\n",
            );
        }
        prompt
    }

    /// Take a turn in a group chat: the shared history is rendered from this
    /// agent's point of view and the reply text is returned.
    pub async fn respond(
        &self,
        history: &ChatHistory,
    ) -> Result<AgentResponse, Box<dyn Error + Send + Sync>> {
        let conversation = history.to_llm_messages(&self.name);
        let (response, _) = self.run_turn(conversation).await?;
        Ok(response)
    }

    /// Single-agent exchange: append `user_text` to `thread`, run the turn, and
    /// record every message it produced (tool round-trips included) in the thread.
    pub async fn get_response(
        &self,
        thread: &mut AgentThread,
        user_text: &str,
    ) -> Result<AgentResponse, Box<dyn Error + Send + Sync>> {
        let mut conversation = thread.messages.clone();
        conversation.push(Message::new(Role::User, user_text));

        let (response, produced) = self.run_turn(conversation).await?;
        thread.messages.push(Message::new(Role::User, user_text));
        thread.messages.extend(produced);
        Ok(response)
    }

    /// Send `conversation` (without system prompt) and resolve tool calls.
    /// Returns the response and the messages added after the input.
    async fn run_turn(
        &self,
        conversation: Vec<Message>,
    ) -> Result<(AgentResponse, Vec<Message>), Box<dyn Error + Send + Sync>> {
        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(Message::new(Role::System, self.system_prompt()));
        messages.extend(conversation);
        let first_new = messages.len();

        let mut usage = TokenUsage::default();
        let mut tool_calls_made = 0;

        let mut reply = self.send(&messages, &mut usage).await?;

        loop {
            let call = match parse_tool_call(&reply) {
                Some(call) if !self.tools.is_empty() => call,
                _ => break,
            };
            if tool_calls_made >= self.max_tool_iterations {
                log::warn!(
                    "Agent::run_turn(...): {} hit the limit of {} tool calls",
                    self.name,
                    self.max_tool_iterations
                );
                reply.push_str("\n\n[Warning: Maximum tool iterations reached]");
                break;
            }
            tool_calls_made += 1;

            log::debug!(
                "Agent::run_turn(...): {} calls tool '{}' with {}",
                self.name,
                call.name,
                call.parameters
            );
            let feedback = match self.tools.execute_tool(&call.name, call.parameters).await {
                Ok(result) if result.success => format!(
                    "Tool '{}' executed successfully. Result: {}",
                    call.name,
                    result.to_prompt_text()
                ),
                Ok(result) => format!(
                    "Tool '{}' failed. Error: {}",
                    call.name,
                    result.error.as_deref().unwrap_or("unknown error")
                ),
                Err(err) => format!("Tool execution error: {}", err),
            };

            messages.push(Message::new(Role::Assistant, &reply));
            messages.push(Message::new(Role::User, feedback));
            reply = self.send(&messages, &mut usage).await?;
        }

        messages.push(Message::new(Role::Assistant, &reply));
        let produced = messages.split_off(first_new);

        let tokens_used = if usage.total_tokens > 0 {
            Some(usage)
        } else {
            None
        };
        Ok((
            AgentResponse {
                content: reply,
                tokens_used,
                tool_calls_made,
            },
            produced,
        ))
    }

    async fn send(
        &self,
        messages: &[Message],
        usage: &mut TokenUsage,
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        let reply = self.client.send_message(messages).await?;
        if let Some(last) = self.client.get_last_usage().await {
            usage.input_tokens += last.input_tokens;
            usage.output_tokens += last.output_tokens;
            usage.total_tokens += last.total_tokens;
        }
        Ok(reply.content.to_string())
    }
}

/// Find the first `{"tool_call": {...}}` object in `response`.
///
/// The object may be surrounded by prose; its end is located by counting braces
/// outside of JSON strings.
///
/// ```rust
/// use agentlab::agent::parse_tool_call;
///
/// let call = parse_tool_call(r#"Sure. {"tool_call": {"name": "get_time", "parameters": {}}}"#).unwrap();
/// assert_eq!(call.name, "get_time");
/// assert!(parse_tool_call("The answer is 42.").is_none());
/// ```
pub fn parse_tool_call(response: &str) -> Option<ToolCall> {
    let start = response.find("{\"tool_call\"")?;
    let fragment = &response[start..];

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut end = None;
    for (i, ch) in fragment.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(i + 1);
                    break;
                }
            }
            _ => {}
        }
    }

    let parsed: serde_json::Value = serde_json::from_str(&fragment[..end?]).ok()?;
    let call = parsed.get("tool_call")?;
    let name = call.get("name")?.as_str()?;
    let parameters = call
        .get("parameters")
        .cloned()
        .unwrap_or_else(|| serde_json::json!({}));
    Some(ToolCall {
        name: name.to_string(),
        parameters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct SilentClient;

    #[async_trait]
    impl ClientWrapper for SilentClient {
        fn model_name(&self) -> &str {
            "silent"
        }

        async fn send_message(
            &self,
            _messages: &[Message],
        ) -> Result<Message, Box<dyn Error + Send + Sync>> {
            Ok(Message::new(Role::Assistant, "..."))
        }
    }

    #[test]
    fn test_parse_tool_call_ignores_braces_in_strings() {
        let text = r#"{"tool_call": {"name": "echo", "parameters": {"text": "a } b {"}}} trailing"#;
        let call = parse_tool_call(text).unwrap();
        assert_eq!(call.parameters["text"], "a } b {");
    }

    #[test]
    fn test_parse_tool_call_defaults_parameters() {
        let call = parse_tool_call(r#"{"tool_call": {"name": "get_time"}}"#).unwrap();
        assert_eq!(call.parameters, serde_json::json!({}));
    }

    #[test]
    fn test_parse_tool_call_rejects_broken_json() {
        assert!(parse_tool_call(r#"{"tool_call": {"name": }"#).is_none());
    }

    #[test]
    fn test_system_prompt_without_tools() {
        let agent = Agent::new("Assistant", Arc::new(SilentClient))
            .with_description("Writes Python code.")
            .with_instructions("Reply in a single message.");
        let prompt = agent.system_prompt();
        assert!(prompt.starts_with("You are Assistant.\nWrites Python code.\n"));
        assert!(prompt.contains("Reply in a single message."));
        assert!(!prompt.contains("tool_call"));
    }
}
