//! Tool layer: independently invocable capabilities offered to the model.
//!
//! The decision node advertises every registered tool's [`ToolSpec`]; the
//! tool execution node dispatches requested calls through the
//! [`ToolRegistry`]. Pure tools (date/time) live here; network-backed tools
//! (web search) are implemented in quill-infra against the same trait.

pub mod datetime;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use quill_types::error::ToolError;
use quill_types::llm::ToolSpec;

/// Registry name of the web search tool.
pub const SEARCH_TOOL: &str = "web_search";
/// Registry name of the date/time tool.
pub const DATE_TIME_TOOL: &str = "date_time";

/// Result of a tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Formatted text folded back into the conversation as a tool message.
    pub content: String,
    /// Source URLs extracted from results (search tool only).
    pub urls: Vec<String>,
    /// Compact display string for the client event stream, when the full
    /// content is too verbose to surface directly (date/time tool).
    pub display: Option<String>,
}

/// An externally invocable capability.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Registry name; must match the name advertised in [`Tool::spec`].
    fn name(&self) -> &str;

    /// Schema advertised to the model.
    fn spec(&self) -> ToolSpec;

    /// Execute with the model-supplied JSON arguments.
    async fn invoke(&self, arguments: &Value) -> Result<ToolOutput, ToolError>;
}

/// Name-keyed set of tools shared by the decision and execution nodes.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its own name, replacing any previous entry.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Look up a tool; an unrecognized name is an error, not a no-op.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }

    /// Specs of every registered tool, for binding onto LLM requests.
    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self.tools.values().map(|t| t.spec()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }
}
