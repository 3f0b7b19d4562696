// Tool execution
//
// The executor resolves the tool by name, times the invocation with a
// monotonic clock, and folds the outcome into an `ExecutionOutcome` value.
// Tool failures are data, not control flow: the only error the executor
// itself raises is `ToolNotFound`, so callers can tell a missing tool apart
// from a tool that ran and failed.

use std::time::Instant;

use serde_json::Value;
use tracing::{debug, warn};

use super::ToolRegistry;

/// The requested tool is not registered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("tool not found: '{0}'")]
pub struct ToolNotFound(pub String);

/// Outcome of a single tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub tool_name: String,
    pub success: bool,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub execution_time_ms: f64,
}

impl ExecutionOutcome {
    fn succeeded(tool_name: String, result: Value, execution_time_ms: f64) -> Self {
        Self {
            tool_name,
            success: true,
            result: Some(result),
            error: None,
            execution_time_ms,
        }
    }

    fn failed(tool_name: String, error: String, execution_time_ms: f64) -> Self {
        Self {
            tool_name,
            success: false,
            result: None,
            error: Some(error),
            execution_time_ms,
        }
    }
}

/// Execute a registered tool with the given arguments.
pub async fn execute_tool(
    tool_name: &str,
    arguments: Value,
    registry: &ToolRegistry,
) -> Result<ExecutionOutcome, ToolNotFound> {
    let tool = registry
        .get(tool_name)
        .ok_or_else(|| ToolNotFound(tool_name.to_string()))?;

    let started = Instant::now();
    let result = tool.invoke(arguments).await;
    let execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;

    match result {
        Ok(value) => {
            debug!(tool_name, execution_time_ms, "tool execution succeeded");
            Ok(ExecutionOutcome::succeeded(
                tool_name.to_string(),
                value,
                execution_time_ms,
            ))
        }
        Err(err) => {
            warn!(tool_name, error = %err, "tool execution failed");
            Ok(ExecutionOutcome::failed(
                tool_name.to_string(),
                err.to_string(),
                execution_time_ms,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtin_registry;
    use serde_json::json;

    #[tokio::test]
    async fn successful_execution_reports_timing() {
        let registry = builtin_registry();
        let outcome = execute_tool("echo", json!({"message": "hello"}), &registry)
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.tool_name, "echo");
        assert_eq!(outcome.result, Some(json!("hello")));
        assert!(outcome.error.is_none());
        assert!(outcome.execution_time_ms >= 0.0);
    }

    #[tokio::test]
    async fn tool_failures_become_outcomes() {
        let registry = builtin_registry();
        let outcome = execute_tool("calculate", json!({"expression": "1 / 0"}), &registry)
            .await
            .unwrap();

        assert!(!outcome.success);
        assert!(outcome.result.is_none());
        assert!(outcome.error.as_deref().unwrap().contains("division by zero"));
    }

    #[tokio::test]
    async fn unknown_tools_are_a_distinct_error() {
        let registry = builtin_registry();
        let err = execute_tool("no_such_tool", json!({}), &registry)
            .await
            .unwrap_err();
        assert_eq!(err, ToolNotFound("no_such_tool".to_string()));
    }
}
