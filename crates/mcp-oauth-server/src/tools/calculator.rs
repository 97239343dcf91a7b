//! Calculator tools: add, subtract, multiply, divide, power, square_root.

use serde_json::json;

use super::{McpTool, ToolContext};
use crate::error::{ToolError, ToolResult};
use crate::models::{BinaryOpInput, PowerInput, SquareRootInput};

fn binary_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "a": {"type": "integer"},
            "b": {"type": "integer"}
        },
        "required": ["a", "b"]
    })
}

fn overflow() -> ToolError {
    ToolError::validation("a", "result is out of range")
}

/// Integer addition.
pub struct AddTool;

#[async_trait::async_trait]
impl McpTool for AddTool {
    fn name(&self) -> &'static str {
        "add"
    }

    fn description(&self) -> &'static str {
        "Add two numbers."
    }

    fn input_schema(&self) -> serde_json::Value {
        binary_schema()
    }

    async fn execute(&self, _ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let BinaryOpInput { a, b } = serde_json::from_value(input)?;
        a.checked_add(b).map(|r| r.to_string()).ok_or_else(overflow)
    }
}

/// Integer subtraction.
pub struct SubtractTool;

#[async_trait::async_trait]
impl McpTool for SubtractTool {
    fn name(&self) -> &'static str {
        "subtract"
    }

    fn description(&self) -> &'static str {
        "Subtract two numbers."
    }

    fn input_schema(&self) -> serde_json::Value {
        binary_schema()
    }

    async fn execute(&self, _ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let BinaryOpInput { a, b } = serde_json::from_value(input)?;
        a.checked_sub(b).map(|r| r.to_string()).ok_or_else(overflow)
    }
}

/// Integer multiplication.
pub struct MultiplyTool;

#[async_trait::async_trait]
impl McpTool for MultiplyTool {
    fn name(&self) -> &'static str {
        "multiply"
    }

    fn description(&self) -> &'static str {
        "Multiply two numbers."
    }

    fn input_schema(&self) -> serde_json::Value {
        binary_schema()
    }

    async fn execute(&self, _ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let BinaryOpInput { a, b } = serde_json::from_value(input)?;
        a.checked_mul(b).map(|r| r.to_string()).ok_or_else(overflow)
    }
}

/// Division with a floating-point result.
pub struct DivideTool;

#[async_trait::async_trait]
impl McpTool for DivideTool {
    fn name(&self) -> &'static str {
        "divide"
    }

    fn description(&self) -> &'static str {
        "Divide two numbers."
    }

    fn input_schema(&self) -> serde_json::Value {
        binary_schema()
    }

    #[allow(clippy::cast_precision_loss)]
    async fn execute(&self, _ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let BinaryOpInput { a, b } = serde_json::from_value(input)?;
        if b == 0 {
            return Err(ToolError::validation("b", "Cannot divide by zero."));
        }
        Ok((a as f64 / b as f64).to_string())
    }
}

/// Exponentiation.
pub struct PowerTool;

#[async_trait::async_trait]
impl McpTool for PowerTool {
    fn name(&self) -> &'static str {
        "power"
    }

    fn description(&self) -> &'static str {
        "Raise a number to the power of another number."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "base": {"type": "integer"},
                "exponent": {"type": "integer"}
            },
            "required": ["base", "exponent"]
        })
    }

    #[allow(clippy::cast_precision_loss)]
    async fn execute(&self, _ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let PowerInput { base, exponent } = serde_json::from_value(input)?;
        Ok((base as f64).powf(exponent as f64).to_string())
    }
}

/// Square root.
pub struct SquareRootTool;

#[async_trait::async_trait]
impl McpTool for SquareRootTool {
    fn name(&self) -> &'static str {
        "square_root"
    }

    fn description(&self) -> &'static str {
        "Calculate the square root of a number."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "a": {"type": "integer", "minimum": 0}
            },
            "required": ["a"]
        })
    }

    #[allow(clippy::cast_precision_loss)]
    async fn execute(&self, _ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let SquareRootInput { a } = serde_json::from_value(input)?;
        if a < 0 {
            return Err(ToolError::validation(
                "a",
                "Cannot calculate the square root of a negative number.",
            ));
        }
        Ok((a as f64).sqrt().to_string())
    }
}
