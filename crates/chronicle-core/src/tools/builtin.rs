// Built-in tools
//
// The three tools every deployment carries: the current UTC time, an echo
// for wiring checks, and the restricted arithmetic evaluator.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use super::calc::evaluate_expression;
use super::{Tool, ToolError, ToolRegistry};

/// A registry pre-loaded with the built-in tools.
pub fn builtin_registry() -> ToolRegistry {
    ToolRegistry::builder()
        .tool(GetCurrentTimeTool)
        .tool(EchoTool)
        .tool(CalculateTool)
        .build()
}

/// Returns the current date and time as an RFC 3339 / ISO 8601 UTC string.
pub struct GetCurrentTimeTool;

#[async_trait]
impl Tool for GetCurrentTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time in ISO 8601 format (UTC)"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn invoke(&self, _arguments: Value) -> Result<Value, ToolError> {
        Ok(json!(Utc::now().to_rfc3339()))
    }
}

/// Returns its `message` argument unchanged.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo a message back (useful for testing)"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The message to echo back"
                }
            },
            "required": ["message"]
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, ToolError> {
        let message = arguments
            .get("message")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("'message' is required".to_string()))?;
        Ok(json!(message))
    }
}

/// Evaluates a restricted arithmetic expression. No identifiers, no calls;
/// see `calc.rs` for exactly what is accepted.
pub struct CalculateTool;

#[async_trait]
impl Tool for CalculateTool {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Safely evaluate an arithmetic expression (supports + - * / // % ** and parentheses)"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Arithmetic expression to evaluate, e.g. '55 + 10'"
                }
            },
            "required": ["expression"]
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, ToolError> {
        let expression = arguments
            .get("expression")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("'expression' is required".to_string()))?;

        let value = evaluate_expression(expression)
            .map_err(|err| ToolError::Failed(err.to_string()))?;
        Ok(json!(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn get_current_time_returns_rfc3339_utc() {
        let value = GetCurrentTimeTool.invoke(json!({})).await.unwrap();
        let text = value.as_str().unwrap();
        let parsed = DateTime::parse_from_rfc3339(text).unwrap();
        assert_eq!(parsed.offset().local_minus_utc(), 0);
    }

    #[tokio::test]
    async fn echo_returns_argument_unchanged() {
        let value = EchoTool
            .invoke(json!({"message": "Hello, World!"}))
            .await
            .unwrap();
        assert_eq!(value, json!("Hello, World!"));

        let err = EchoTool.invoke(json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn calculate_evaluates_and_rejects() {
        let value = CalculateTool
            .invoke(json!({"expression": "55 + 10"}))
            .await
            .unwrap();
        assert_eq!(value, json!(65.0));

        let err = CalculateTool
            .invoke(json!({"expression": "__import__('os').system('ls')"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Failed(_)));

        let err = CalculateTool
            .invoke(json!({"expression": "1 / 0"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("division by zero"));
    }
}
