//! [`CustomToolProtocol`]: plain Rust closures exposed as tools.
//!
//! ```rust
//! use agentlab::tool_protocol::{ToolMetadata, ToolParameter, ToolParameterType, ToolResult};
//! use agentlab::tool_protocols::CustomToolProtocol;
//! use std::sync::Arc;
//!
//! # async {
//! let protocol = CustomToolProtocol::new();
//! protocol
//!     .register_tool(
//!         ToolMetadata::new("shout", "Upper-case a string")
//!             .with_parameter(ToolParameter::new("text", ToolParameterType::String).required()),
//!         Arc::new(|params: serde_json::Value| {
//!             let text = params["text"].as_str().unwrap_or_default();
//!             Ok(ToolResult::success(serde_json::json!(text.to_uppercase())))
//!         }),
//!     )
//!     .await;
//! # };
//! ```

use crate::agentlab::tool_protocol::{ToolError, ToolMetadata, ToolProtocol, ToolResult};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::error::Error;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::RwLock;

pub type ToolFunction =
    Arc<dyn Fn(JsonValue) -> Result<ToolResult, Box<dyn Error + Send + Sync>> + Send + Sync>;

pub type ToolFuture = Pin<Box<dyn Future<Output = Result<ToolResult, Box<dyn Error + Send + Sync>>> + Send>>;

pub type AsyncToolFunction = Arc<dyn Fn(JsonValue) -> ToolFuture + Send + Sync>;

#[derive(Clone)]
enum Handler {
    Sync(ToolFunction),
    Async(AsyncToolFunction),
}

struct RegisteredTool {
    metadata: ToolMetadata,
    handler: Handler,
}

/// Registry of closures callable by name. Registering a name twice replaces the
/// earlier tool.
#[derive(Default)]
pub struct CustomToolProtocol {
    tools: RwLock<HashMap<String, RegisteredTool>>,
}

impl CustomToolProtocol {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register_tool(&self, metadata: ToolMetadata, function: ToolFunction) {
        self.insert(metadata, Handler::Sync(function)).await;
    }

    pub async fn register_async_tool(&self, metadata: ToolMetadata, function: AsyncToolFunction) {
        self.insert(metadata, Handler::Async(function)).await;
    }

    pub async fn unregister_tool(&self, name: &str) -> bool {
        self.tools.write().await.remove(name).is_some()
    }

    async fn insert(&self, metadata: ToolMetadata, handler: Handler) {
        let name = metadata.name.clone();
        self.tools
            .write()
            .await
            .insert(name, RegisteredTool { metadata, handler });
    }
}

#[async_trait]
impl ToolProtocol for CustomToolProtocol {
    async fn execute(
        &self,
        tool_name: &str,
        parameters: JsonValue,
    ) -> Result<ToolResult, Box<dyn Error + Send + Sync>> {
        // Clone the handler out so the lock is not held across the call.
        let handler = self
            .tools
            .read()
            .await
            .get(tool_name)
            .map(|t| t.handler.clone())
            .ok_or_else(|| ToolError::NotFound(tool_name.to_string()))?;

        match handler {
            Handler::Sync(f) => f(parameters),
            Handler::Async(f) => f(parameters).await,
        }
    }

    async fn list_tools(&self) -> Result<Vec<ToolMetadata>, Box<dyn Error + Send + Sync>> {
        Ok(self
            .tools
            .read()
            .await
            .values()
            .map(|t| t.metadata.clone())
            .collect())
    }

    fn protocol_name(&self) -> &str {
        "custom"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sync_and_async_tools() {
        let protocol = CustomToolProtocol::new();
        protocol
            .register_tool(
                ToolMetadata::new("double", "Double a number"),
                Arc::new(|p: JsonValue| {
                    Ok(ToolResult::success(serde_json::json!(p["n"].as_i64().unwrap_or(0) * 2)))
                }),
            )
            .await;
        protocol
            .register_async_tool(
                ToolMetadata::new("later", "Answer after yielding"),
                Arc::new(|_: JsonValue| -> ToolFuture {
                    Box::pin(async {
                        tokio::task::yield_now().await;
                        Ok(ToolResult::success(serde_json::json!("done")))
                    })
                }),
            )
            .await;

        let doubled = protocol.execute("double", serde_json::json!({"n": 21})).await.unwrap();
        assert_eq!(doubled.output, serde_json::json!(42));
        let later = protocol.execute("later", serde_json::json!({})).await.unwrap();
        assert_eq!(later.output, serde_json::json!("done"));
        assert_eq!(protocol.list_tools().await.unwrap().len(), 2);
        assert_eq!(
            protocol.get_tool_metadata("later").await.unwrap().description,
            "Answer after yielding"
        );
    }

    #[tokio::test]
    async fn test_unregister() {
        let protocol = CustomToolProtocol::new();
        protocol
            .register_tool(
                ToolMetadata::new("noop", "Nothing"),
                Arc::new(|_: JsonValue| Ok(ToolResult::success(JsonValue::Null))),
            )
            .await;
        assert!(protocol.unregister_tool("noop").await);
        assert!(protocol.execute("noop", JsonValue::Null).await.is_err());
    }
}
