//! Native tool plugins that agents can call.
//!
//! - **CalculatorPlugin**: `calculate(a, b, operator)` on integers
//! - **TimePlugin**: `get_time()` returning a fixed time
//!
//! Both implement [`ToolProtocol`](crate::tool_protocol::ToolProtocol) directly, so
//! they can be added to a [`ToolRegistry`](crate::tool_protocol::ToolRegistry) as-is.

pub mod calculator;
pub mod clock;

pub use calculator::CalculatorPlugin;
pub use clock::TimePlugin;
