//! Calculator tool tests.

use std::sync::Arc;

use serde_json::json;

use mcp_oauth_server::client::WeatherClient;
use mcp_oauth_server::config::Config;
use mcp_oauth_server::error::ToolError;
use mcp_oauth_server::tools::{
    AddTool, DivideTool, McpTool, MultiplyTool, PowerTool, SquareRootTool, SubtractTool,
    ToolContext, register_all_tools,
};

const PRIVATE_KEY: &str = include_str!("fixtures/test_signing_key.pem");

fn ctx() -> ToolContext {
    let config = Config::for_testing("http://unused.localhost", PRIVATE_KEY);
    ToolContext::new(Arc::new(WeatherClient::new(&config).unwrap()))
}

#[tokio::test]
async fn test_integer_operations() {
    let ctx = ctx();
    assert_eq!(AddTool.execute(&ctx, json!({"a": 2, "b": 3})).await.unwrap(), "5");
    assert_eq!(SubtractTool.execute(&ctx, json!({"a": 2, "b": 3})).await.unwrap(), "-1");
    assert_eq!(MultiplyTool.execute(&ctx, json!({"a": -4, "b": 3})).await.unwrap(), "-12");
}

#[tokio::test]
async fn test_divide() {
    let ctx = ctx();
    assert_eq!(DivideTool.execute(&ctx, json!({"a": 7, "b": 2})).await.unwrap(), "3.5");

    let err = DivideTool.execute(&ctx, json!({"a": 1, "b": 0})).await.unwrap_err();
    assert!(err.to_user_message().contains("Cannot divide by zero"));
}

#[tokio::test]
async fn test_power_and_square_root() {
    let ctx = ctx();
    assert_eq!(PowerTool.execute(&ctx, json!({"base": 2, "exponent": 10})).await.unwrap(), "1024");
    assert_eq!(PowerTool.execute(&ctx, json!({"base": 2, "exponent": -1})).await.unwrap(), "0.5");
    assert_eq!(SquareRootTool.execute(&ctx, json!({"a": 16})).await.unwrap(), "4");

    let err = SquareRootTool.execute(&ctx, json!({"a": -1})).await.unwrap_err();
    assert!(matches!(err, ToolError::Validation { .. }));
}

#[tokio::test]
async fn test_overflow_is_reported() {
    let ctx = ctx();
    let result = AddTool.execute(&ctx, json!({"a": i64::MAX, "b": 1})).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_missing_argument() {
    let ctx = ctx();
    let result = AddTool.execute(&ctx, json!({"a": 1})).await;
    assert!(matches!(result, Err(ToolError::Serialization(_))));
}

#[test]
fn test_registry_names_are_unique() {
    let tools = register_all_tools();
    let mut names: Vec<_> = tools.iter().map(|t| t.name()).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), tools.len());
    assert!(names.contains(&"get_forecast"));
    assert!(names.contains(&"square_root"));
}
