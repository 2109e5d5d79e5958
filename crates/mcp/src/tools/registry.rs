// Tool trait and the static tool registry

use crate::protocol::ToolDescriptor;
use anyhow::Result;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Tool executor trait
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Catalog entry for this tool
    fn descriptor(&self) -> ToolDescriptor;

    /// Execute the tool with normalized arguments
    async fn execute(&self, arguments: Map<String, Value>) -> Result<Value>;
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Tool name must not be empty")]
    EmptyName,
}

/// A registered tool with its descriptor captured at registration
#[derive(Clone)]
pub struct RegisteredTool {
    descriptor: ToolDescriptor,
    tool: Arc<dyn Tool>,
}

impl RegisteredTool {
    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    pub fn tool(&self) -> Arc<dyn Tool> {
        Arc::clone(&self.tool)
    }
}

/// Collects tools before the registry is frozen
#[derive(Default)]
pub struct ToolRegistryBuilder {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistryBuilder {
    /// Register a tool
    pub fn register(mut self, tool: Arc<dyn Tool>) -> Result<Self, RegistryError> {
        let descriptor = tool.descriptor();
        if descriptor.name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.tools.iter().any(|t| t.descriptor.name == descriptor.name) {
            return Err(RegistryError::DuplicateTool(descriptor.name));
        }

        self.tools.push(RegisteredTool { descriptor, tool });
        Ok(self)
    }

    pub fn build(self) -> ToolRegistry {
        let index = self
            .tools
            .iter()
            .enumerate()
            .map(|(i, t)| (t.descriptor.name.clone(), i))
            .collect();

        ToolRegistry {
            tools: self.tools,
            index,
        }
    }
}

/// Read-only catalog of invocable tools, in registration order
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    /// Look up a tool by name
    pub fn resolve(&self, name: &str) -> Option<&RegisteredTool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// All tool descriptors, in registration order
    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor.clone()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.descriptor.name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ParamType, ParameterDescriptor};

    struct NamedTool(&'static str);

    #[async_trait::async_trait]
    impl Tool for NamedTool {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor {
                name: self.0.to_string(),
                description: format!("{} tool", self.0),
                parameters: vec![ParameterDescriptor::required(
                    "x",
                    ParamType::String,
                    "input",
                )],
            }
        }

        async fn execute(&self, _arguments: Map<String, Value>) -> Result<Value> {
            Ok(Value::String(self.0.to_string()))
        }
    }

    #[test]
    fn test_list_preserves_registration_order() {
        let registry = ToolRegistry::builder()
            .register(Arc::new(NamedTool("zeta")))
            .unwrap()
            .register(Arc::new(NamedTool("alpha")))
            .unwrap()
            .register(Arc::new(NamedTool("mid")))
            .unwrap()
            .build();

        assert_eq!(registry.names(), vec!["zeta", "alpha", "mid"]);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.list()[1].description, "alpha tool");
    }

    #[test]
    fn test_resolve() {
        let registry = ToolRegistry::builder()
            .register(Arc::new(NamedTool("alpha")))
            .unwrap()
            .build();

        let found = registry.resolve("alpha").unwrap();
        assert_eq!(found.descriptor().name, "alpha");
        assert!(registry.resolve("Alpha").is_none());
        assert!(registry.resolve("missing").is_none());
        assert!(registry.contains("alpha"));
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let result = ToolRegistry::builder()
            .register(Arc::new(NamedTool("alpha")))
            .unwrap()
            .register(Arc::new(NamedTool("alpha")));

        assert!(matches!(result, Err(RegistryError::DuplicateTool(name)) if name == "alpha"));
    }

    #[test]
    fn test_empty_registry() {
        let registry = ToolRegistry::builder().build();
        assert!(registry.is_empty());
        assert!(registry.list().is_empty());
    }
}
