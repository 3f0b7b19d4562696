// Tool framework
//
// Tools are named callables with a JSON-schema parameter description,
// registered once and looked up by the engine's tool step. Execution is
// in-process: the executor times the call with a monotonic clock and turns
// every tool failure into a value, never a panic or a crashed engine.

mod builtin;
mod calc;
mod exec;

pub use builtin::{builtin_registry, CalculateTool, EchoTool, GetCurrentTimeTool};
pub use calc::{evaluate_expression, CalcError};
pub use exec::{execute_tool, ExecutionOutcome, ToolNotFound};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error raised by a tool implementation. The executor catches these and
/// records them; they never propagate out of a tool step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Failed(String),
}

/// Error registering a tool.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    Duplicate(String),
}

/// A tool declaration as handed to the LLM adapters: name, description, and
/// a JSON-schema object describing the parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A callable the agent can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name within a registry; this is what the model calls.
    fn name(&self) -> &str;

    /// Description shown to the model.
    fn description(&self) -> &str;

    /// JSON schema (`type: object`) for the arguments.
    fn parameters_schema(&self) -> Value;

    /// Run the tool. Arguments arrive as the raw JSON object from the model;
    /// they are not validated against the schema before invocation.
    async fn invoke(&self, arguments: Value) -> Result<Value, ToolError>;

    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Registry of tools, read-only after construction and safe to share.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    /// Register a tool. Registering a second tool under an existing name is
    /// an error, not a replacement.
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), RegistryError> {
        self.register_arc(Arc::new(tool))
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Declarations for every registered tool, sorted by name so the list is
    /// stable across runs.
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        let mut declarations: Vec<ToolDeclaration> =
            self.tools.values().map(|t| t.declaration()).collect();
        declarations.sort_by(|a, b| a.name.cmp(&b.name));
        declarations
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

/// Fluent construction for registries.
#[derive(Default)]
pub struct ToolRegistryBuilder {
    registry: ToolRegistry,
}

impl ToolRegistryBuilder {
    /// Add a tool, panicking on a duplicate name. Builders run at startup
    /// where a duplicate is a programming error.
    pub fn tool(mut self, tool: impl Tool + 'static) -> Self {
        if let Err(err) = self.registry.register(tool) {
            panic!("{err}");
        }
        self
    }

    pub fn build(self) -> ToolRegistry {
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Doubler;

    #[async_trait]
    impl Tool for Doubler {
        fn name(&self) -> &str {
            "double"
        }

        fn description(&self) -> &str {
            "Double a number"
        }

        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {
                    "value": {"type": "number", "description": "Number to double"}
                },
                "required": ["value"]
            })
        }

        async fn invoke(&self, arguments: Value) -> Result<Value, ToolError> {
            let value = arguments
                .get("value")
                .and_then(Value::as_f64)
                .ok_or_else(|| ToolError::InvalidArguments("value is required".to_string()))?;
            Ok(json!(value * 2.0))
        }
    }

    #[test]
    fn register_and_look_up() {
        let mut registry = ToolRegistry::new();
        registry.register(Doubler).unwrap();

        assert!(registry.has("double"));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Doubler).unwrap();
        assert_eq!(
            registry.register(Doubler).unwrap_err(),
            RegistryError::Duplicate("double".to_string())
        );
    }

    #[test]
    fn declarations_are_sorted_and_complete() {
        let registry = builtin_registry();
        let declarations = registry.declarations();
        let names: Vec<&str> = declarations.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["calculate", "echo", "get_current_time"]);
        for declaration in &declarations {
            assert_eq!(declaration.parameters["type"], "object");
            assert!(!declaration.description.is_empty());
        }
    }
}
