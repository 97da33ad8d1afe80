use crate::agentlab::tool_protocol::{ToolError, ToolMetadata, ToolProtocol, ToolResult};
use async_trait::async_trait;
use serde_json::Value;
use std::error::Error;

pub const GET_TIME_TOOL: &str = "get_time";
pub const FIXED_TIME: &str = "12:00:00";

/// Reports a fixed time of day. Handy for checking that an agent calls tools at all.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimePlugin;

#[async_trait]
impl ToolProtocol for TimePlugin {
    async fn execute(
        &self,
        tool_name: &str,
        _parameters: Value,
    ) -> Result<ToolResult, Box<dyn Error + Send + Sync>> {
        if tool_name != GET_TIME_TOOL {
            return Err(Box::new(ToolError::NotFound(tool_name.to_string())));
        }
        Ok(ToolResult::success(Value::String(FIXED_TIME.to_string())))
    }

    async fn list_tools(&self) -> Result<Vec<ToolMetadata>, Box<dyn Error + Send + Sync>> {
        Ok(vec![ToolMetadata::new(
            GET_TIME_TOOL,
            "Returns a fixed time (12:00:00)",
        )])
    }

    fn protocol_name(&self) -> &str {
        "time"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_time() {
        let result = TimePlugin.execute("get_time", Value::Null).await.unwrap();
        assert_eq!(result.output, Value::String("12:00:00".into()));
        assert!(TimePlugin.execute("get_date", Value::Null).await.is_err());
    }
}
