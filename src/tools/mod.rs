//! Tool abstraction and registry.
//!
//! Domain tools are opaque async callables discovered at startup. Each
//! carries a namespaced name, `<source>__<tool>`, and the source prefix is
//! what binds a tool to a domain agent: the `apm` agent gets every tool
//! named `apm__*`, and so on.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Separator between the source namespace and the tool name.
pub const NAMESPACE_SEPARATOR: &str = "__";

/// Output of one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub content: String,
    /// Some tool backends report model usage of their own; kept opaque for
    /// the usage normalizer.
    pub usage_metadata: Option<Value>,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage_metadata: None,
        }
    }
}

/// A domain tool the engine can hand to an agent.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Namespaced name, `<source>__<tool>`.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn parameters_schema(&self) -> Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn invoke(&self, args: Value) -> anyhow::Result<ToolOutput>;
}

/// The flat pool of discovered tools, registration order preserved.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from an already-discovered pool.
    pub fn from_discovered(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self { tools }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn all(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tools belonging to one source namespace, order preserved.
    ///
    /// Pure and total: an empty pool or a namespace with no tools yields
    /// an empty vec, never an error.
    pub fn tools_for_source(&self, source: &str) -> Vec<Arc<dyn Tool>> {
        let prefix = format!("{source}{NAMESPACE_SEPARATOR}");
        self.tools
            .iter()
            .filter(|t| t.name().starts_with(&prefix))
            .cloned()
            .collect()
    }
}
