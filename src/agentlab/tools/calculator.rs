//! Integer calculator exposed as the `calculate` tool.
//!
//! ```rust
//! use agentlab::tools::calculator::calculate;
//!
//! assert_eq!(calculate(7, 2, "/"), Ok(3));
//! assert_eq!(calculate(-7, 2, "/"), Ok(-3));
//! assert!(calculate(1, 2, "%").is_err());
//! ```

use crate::agentlab::tool_protocol::{
    ToolError, ToolMetadata, ToolParameter, ToolParameterType, ToolProtocol, ToolResult,
};
use async_trait::async_trait;
use serde_json::Value;
use std::error::Error;

pub const CALCULATE_TOOL: &str = "calculate";

/// Apply `operator` to `a` and `b`. Division truncates toward zero.
pub fn calculate(a: i64, b: i64, operator: &str) -> Result<i64, ToolError> {
    let result = match operator {
        "+" => a.checked_add(b),
        "-" => a.checked_sub(b),
        "*" => a.checked_mul(b),
        "/" => {
            if b == 0 {
                return Err(ToolError::ExecutionFailed("division by zero".to_string()));
            }
            a.checked_div(b)
        }
        _ => return Err(ToolError::InvalidParameters("Invalid operator".to_string())),
    };
    result.ok_or_else(|| ToolError::ExecutionFailed("integer overflow".to_string()))
}

// Models sometimes send integers as strings.
fn integer_param(params: &Value, name: &str) -> Result<i64, ToolError> {
    match &params[name] {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| ToolError::InvalidParameters(format!("'{}' must be an integer", name)))
}

/// Basic arithmetic on two integers: `calculate(a, b, operator)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct CalculatorPlugin;

impl CalculatorPlugin {
    pub fn metadata() -> ToolMetadata {
        ToolMetadata::new(
            CALCULATE_TOOL,
            "Performs basic math operations (add, subtract, multiply, divide)",
        )
        .with_parameter(
            ToolParameter::new("a", ToolParameterType::Integer)
                .with_description("First number")
                .required(),
        )
        .with_parameter(
            ToolParameter::new("b", ToolParameterType::Integer)
                .with_description("Second number")
                .required(),
        )
        .with_parameter(
            ToolParameter::new("operator", ToolParameterType::String)
                .with_description("operator (+, -, *, /)")
                .required(),
        )
    }
}

#[async_trait]
impl ToolProtocol for CalculatorPlugin {
    async fn execute(
        &self,
        tool_name: &str,
        parameters: Value,
    ) -> Result<ToolResult, Box<dyn Error + Send + Sync>> {
        if tool_name != CALCULATE_TOOL {
            return Err(Box::new(ToolError::NotFound(tool_name.to_string())));
        }
        let a = integer_param(&parameters, "a")?;
        let b = integer_param(&parameters, "b")?;
        let operator = parameters["operator"].as_str().unwrap_or_default();

        match calculate(a, b, operator) {
            Ok(value) => Ok(ToolResult::success(Value::String(value.to_string()))),
            Err(err) => Ok(ToolResult::failure(err.to_string())),
        }
    }

    async fn list_tools(&self) -> Result<Vec<ToolMetadata>, Box<dyn Error + Send + Sync>> {
        Ok(vec![Self::metadata()])
    }

    fn protocol_name(&self) -> &str {
        "calculator"
    }
}
