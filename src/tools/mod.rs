//! Tool trait and registry
//!
//! Tools are thin translation layers: each one calls an external provider,
//! reshapes the response into a plain JSON mapping and returns it
//! synchronously. Failures come back as structured error values, never as
//! raised faults — the model inspects the `"error"` key and decides what to
//! do next.

use crate::error::AssistantError;
use crate::llm::ToolDescriptor;
use crate::models::{ToolInput, ToolOutput};
use crate::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub mod analysis;
pub mod portfolio;
pub mod research;

/// Trait for a single tool
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON-schema descriptor of the tool's parameters, handed to the model
    fn parameters(&self) -> Value;

    /// Execute the tool. Domain validation failures and upstream provider
    /// failures yield `Ok` with an error-shaped [`ToolOutput`]; `Err` is
    /// reserved for malformed invocations (missing or ill-typed parameters).
    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput>;
}

/// Tool registry for looking up and executing tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Descriptors for every registered tool, for the chat completions API
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let mut descriptors: Vec<ToolDescriptor> = self
            .tools
            .values()
            .map(|tool| ToolDescriptor {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

//
// ================= Parameter helpers =================
//

pub(crate) fn require_str(input: &ToolInput, key: &str) -> Result<String> {
    input
        .parameters
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
        .ok_or_else(|| {
            AssistantError::InvalidToolInput(format!(
                "{}: expected string parameter '{}'",
                input.tool_name, key
            ))
        })
}

pub(crate) fn require_u64(input: &ToolInput, key: &str) -> Result<u64> {
    input
        .parameters
        .get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| {
            AssistantError::InvalidToolInput(format!(
                "{}: expected positive integer parameter '{}'",
                input.tool_name, key
            ))
        })
}

pub(crate) fn optional_str(input: &ToolInput, key: &str) -> Option<String> {
    input
        .parameters
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

pub(crate) fn optional_u64(input: &ToolInput, key: &str) -> Option<u64> {
    input.parameters.get(key).and_then(Value::as_u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(parameters: Value) -> ToolInput {
        ToolInput {
            tool_name: "test_tool".to_string(),
            parameters,
        }
    }

    #[test]
    fn test_require_str() {
        let input = input(json!({ "symbol": "AAPL", "qty": 10 }));
        assert_eq!(require_str(&input, "symbol").unwrap(), "AAPL");
        assert!(require_str(&input, "qty").is_err());
        assert!(require_str(&input, "missing").is_err());
    }

    #[test]
    fn test_require_u64_rejects_negative() {
        let input = input(json!({ "qty": -3 }));
        assert!(require_u64(&input, "qty").is_err());
    }

    #[test]
    fn test_registry_descriptors_sorted() {
        struct Dummy(&'static str);

        #[async_trait::async_trait]
        impl Tool for Dummy {
            fn name(&self) -> &'static str {
                self.0
            }
            fn description(&self) -> &'static str {
                "dummy"
            }
            fn parameters(&self) -> Value {
                json!({ "type": "object", "properties": {} })
            }
            async fn execute(&self, _input: &ToolInput) -> Result<ToolOutput> {
                Ok(ToolOutput::ok(json!({})))
            }
        }

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Dummy("zeta")));
        registry.register(Arc::new(Dummy("alpha")));

        let descriptors = registry.descriptors();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].name, "alpha");
        assert_eq!(descriptors[1].name, "zeta");
        assert!(registry.get("alpha").is_some());
        assert!(registry.get("beta").is_none());
    }
}
