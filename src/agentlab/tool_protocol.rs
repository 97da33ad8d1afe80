//! Tool abstraction shared by agents and tool providers.
//!
//! ```text
//! Agent → ToolRegistry → ToolProtocol (trait) → [CustomToolProtocol | plugins | user-defined]
//! ```
//!
//! A [`ToolRegistry`] can hold several protocols at once; every tool a protocol
//! lists is routed back to that protocol when the agent calls it.
//!
//! # Example
//!
//! ```rust,no_run
//! use agentlab::tool_protocol::ToolRegistry;
//! use agentlab::tools::{CalculatorPlugin, TimePlugin};
//! use std::sync::Arc;
//!
//! # async {
//! let mut registry = ToolRegistry::empty();
//! registry.add_protocol("math", Arc::new(CalculatorPlugin)).await?;
//! registry.add_protocol("time", Arc::new(TimePlugin)).await?;
//!
//! let result = registry
//!     .execute_tool("calculate", serde_json::json!({"a": 6, "b": 7, "operator": "*"}))
//!     .await?;
//! assert_eq!(result.output, serde_json::json!("42"));
//! # Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
//! # };
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Outcome of one tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: serde_json::Value,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(output: serde_json::Value) -> Self {
        Self {
            success: true,
            output,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: serde_json::Value::Null,
            error: Some(error.into()),
        }
    }

    /// Text fed back to the model after the call.
    pub fn to_prompt_text(&self) -> String {
        if self.success {
            match &self.output {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            }
        } else {
            format!("Error: {}", self.error.as_deref().unwrap_or("unknown error"))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ToolParameterType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ToolParameterType,
    pub description: Option<String>,
    pub required: bool,
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, param_type: ToolParameterType) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: None,
            required: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Name, description and parameters of a tool, as advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
}

impl ToolMetadata {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    /// One catalogue line for the system prompt, e.g.
    /// `- calculate(a: integer, b: integer): Calculate ...`.
    pub fn describe(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| {
                let ty = serde_json::to_value(&p.param_type)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();
                let mut line = format!("{}: {}", p.name, ty);
                if !p.required {
                    line.push('?');
                }
                if let Some(desc) = &p.description {
                    line.push_str(&format!(" ({})", desc));
                }
                line
            })
            .collect();
        format!("- {}({}): {}", self.name, params.join(", "), self.description)
    }
}

/// A source of tools: local functions, plugins, or anything else that can execute
/// a named tool with JSON parameters.
#[async_trait]
pub trait ToolProtocol: Send + Sync {
    async fn execute(
        &self,
        tool_name: &str,
        parameters: serde_json::Value,
    ) -> Result<ToolResult, Box<dyn Error + Send + Sync>>;

    async fn list_tools(&self) -> Result<Vec<ToolMetadata>, Box<dyn Error + Send + Sync>>;

    async fn get_tool_metadata(
        &self,
        tool_name: &str,
    ) -> Result<ToolMetadata, Box<dyn Error + Send + Sync>> {
        self.list_tools()
            .await?
            .into_iter()
            .find(|t| t.name == tool_name)
            .ok_or_else(|| ToolError::NotFound(tool_name.to_string()).into())
    }

    fn protocol_name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolError {
    NotFound(String),
    ExecutionFailed(String),
    InvalidParameters(String),
    ProtocolError(String),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::NotFound(name) => write!(f, "Tool not found: {}", name),
            ToolError::ExecutionFailed(msg) => write!(f, "Tool execution failed: {}", msg),
            ToolError::InvalidParameters(msg) => write!(f, "Invalid parameters: {}", msg),
            ToolError::ProtocolError(msg) => write!(f, "Protocol error: {}", msg),
        }
    }
}

impl Error for ToolError {}

/// Routes tool calls to the protocol that provides each tool.
#[derive(Default)]
pub struct ToolRegistry {
    protocols: HashMap<String, Arc<dyn ToolProtocol>>,
    // tool name -> protocol name
    routes: HashMap<String, String>,
    tools: HashMap<String, ToolMetadata>,
}

impl ToolRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register `protocol` under `name` and index every tool it lists.
    ///
    /// A tool name already provided by another protocol is rerouted to this one.
    pub async fn add_protocol(
        &mut self,
        name: &str,
        protocol: Arc<dyn ToolProtocol>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let tools = protocol.list_tools().await?;
        for tool in tools {
            if let Some(previous) = self.routes.insert(tool.name.clone(), name.to_string()) {
                if previous != name {
                    log::warn!(
                        "ToolRegistry::add_protocol(...): tool '{}' moved from '{}' to '{}'",
                        tool.name,
                        previous,
                        name
                    );
                }
            }
            self.tools.insert(tool.name.clone(), tool);
        }
        self.protocols.insert(name.to_string(), protocol);
        Ok(())
    }

    /// Drop a protocol and every tool routed to it.
    pub fn remove_protocol(&mut self, name: &str) -> Option<Arc<dyn ToolProtocol>> {
        let removed = self.protocols.remove(name)?;
        let tools = &mut self.tools;
        self.routes.retain(|tool, protocol| {
            let keep = protocol != name;
            if !keep {
                tools.remove(tool);
            }
            keep
        });
        Some(removed)
    }

    pub fn protocol_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.protocols.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Every known tool, sorted by name.
    pub fn list_tools(&self) -> Vec<&ToolMetadata> {
        let mut tools: Vec<&ToolMetadata> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub fn get_tool(&self, name: &str) -> Option<&ToolMetadata> {
        self.tools.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn execute_tool(
        &self,
        tool_name: &str,
        parameters: serde_json::Value,
    ) -> Result<ToolResult, Box<dyn Error + Send + Sync>> {
        let protocol = self
            .routes
            .get(tool_name)
            .and_then(|p| self.protocols.get(p))
            .ok_or_else(|| ToolError::NotFound(tool_name.to_string()))?;
        protocol.execute(tool_name, parameters).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoProtocol(&'static str);

    #[async_trait]
    impl ToolProtocol for EchoProtocol {
        async fn execute(
            &self,
            tool_name: &str,
            parameters: serde_json::Value,
        ) -> Result<ToolResult, Box<dyn Error + Send + Sync>> {
            Ok(ToolResult::success(serde_json::json!({
                "protocol": self.0,
                "tool": tool_name,
                "params": parameters,
            })))
        }

        async fn list_tools(&self) -> Result<Vec<ToolMetadata>, Box<dyn Error + Send + Sync>> {
            Ok(vec![ToolMetadata::new("echo", "Echo parameters back")])
        }

        fn protocol_name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_describe_marks_optional_parameters() {
        let meta = ToolMetadata::new("greet", "Say hello")
            .with_parameter(ToolParameter::new("name", ToolParameterType::String).required())
            .with_parameter(
                ToolParameter::new("times", ToolParameterType::Integer)
                    .with_description("repeat count"),
            );
        assert_eq!(
            meta.describe(),
            "- greet(name: string, times: integer? (repeat count)): Say hello"
        );
    }

    #[tokio::test]
    async fn test_registry_routes_to_latest_protocol() {
        let mut registry = ToolRegistry::empty();
        registry
            .add_protocol("first", Arc::new(EchoProtocol("first")))
            .await
            .unwrap();
        registry
            .add_protocol("second", Arc::new(EchoProtocol("second")))
            .await
            .unwrap();

        let result = registry
            .execute_tool("echo", serde_json::json!({"x": 1}))
            .await
            .unwrap();
        assert_eq!(result.output["protocol"], "second");
        assert_eq!(registry.protocol_names(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_found() {
        let registry = ToolRegistry::empty();
        let err = registry
            .execute_tool("nope", serde_json::json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Tool not found: nope");
    }

    #[tokio::test]
    async fn test_remove_protocol_drops_its_tools() {
        let mut registry = ToolRegistry::empty();
        registry
            .add_protocol("only", Arc::new(EchoProtocol("only")))
            .await
            .unwrap();
        assert!(registry.remove_protocol("only").is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_tool_result_prompt_text() {
        assert_eq!(ToolResult::success(serde_json::json!("12:00:00")).to_prompt_text(), "12:00:00");
        assert_eq!(ToolResult::failure("boom").to_prompt_text(), "Error: boom");
    }
}
