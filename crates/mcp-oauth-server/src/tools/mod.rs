//! MCP tool implementations served behind the authorization server.
//!
//! Each tool parses and validates its input, does its work, and returns text
//! for the MCP `content` array.

mod calculator;
mod weather;

pub use calculator::*;
pub use weather::*;

use std::sync::Arc;

use crate::client::WeatherClient;
use crate::error::ToolResult;

/// Tool execution context.
pub struct ToolContext {
    /// Weather API client.
    pub weather: Arc<WeatherClient>,
}

impl ToolContext {
    /// Create a new tool context.
    #[must_use]
    pub fn new(weather: Arc<WeatherClient>) -> Self {
        Self { weather }
    }
}

/// Trait for MCP tools.
#[async_trait::async_trait]
pub trait McpTool: Send + Sync {
    /// Tool name (e.g., "get_forecast").
    fn name(&self) -> &'static str;

    /// Tool description for LLM.
    fn description(&self) -> &'static str;

    /// JSON Schema for input parameters.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool with given input.
    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String>;
}

/// Register all tools.
#[must_use]
pub fn register_all_tools() -> Vec<Box<dyn McpTool>> {
    vec![
        // Calculator (6)
        Box::new(calculator::AddTool),
        Box::new(calculator::SubtractTool),
        Box::new(calculator::MultiplyTool),
        Box::new(calculator::DivideTool),
        Box::new(calculator::PowerTool),
        Box::new(calculator::SquareRootTool),
        // Weather (2)
        Box::new(weather::GetAlertsTool),
        Box::new(weather::GetForecastTool),
    ]
}
