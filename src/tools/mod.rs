pub mod add;
pub mod list_day;
pub mod list_range;
pub mod mark_done;
pub mod model_adapter;
pub mod snooze;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::mcp::protocol::{CallToolResult, ContentBlock, ToolDescriptor};
use crate::store::{Task, TaskStore};

use add::AddTool;
use list_day::ListDayTool;
use list_range::ListRangeTool;
use mark_done::MarkDoneTool;
use snooze::SnoozeTool;

/// The result of executing a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: Vec<ContentBlock>,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            is_error: false,
        }
    }

    pub fn lines(lines: Vec<String>) -> Self {
        Self {
            content: lines.into_iter().map(ContentBlock::text).collect(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            is_error: true,
        }
    }

    /// Joined text of every block.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| b.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<ToolResult> for CallToolResult {
    fn from(result: ToolResult) -> Self {
        CallToolResult {
            content: result.content,
            is_error: result.is_error,
        }
    }
}

/// Every tool implements this trait.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses to call this tool.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema describing the tool's input parameters, `owner_id` included.
    fn schema(&self) -> Value;

    /// Execute the tool with the given JSON input.
    async fn execute(&self, input: Value) -> Result<ToolResult>;
}

/// Holds all registered tools and dispatches calls by name.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(Arc::from(tool));
    }

    /// Descriptors served by `tools/list`.
    pub fn definitions(&self) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .map(|t| ToolDescriptor {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: Some(t.schema()),
            })
            .collect()
    }

    /// Look up a tool by name and execute it.
    pub async fn execute(&self, name: &str, input: Value) -> Result<ToolResult> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| anyhow::anyhow!("Unknown tool: {}", name))?;
        tool.execute(input).await
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create a registry with the task tools backed by `store`.
    pub fn with_task_tools(store: Arc<TaskStore>) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(AddTool::new(Arc::clone(&store))));
        registry.register(Box::new(ListDayTool::new(Arc::clone(&store))));
        registry.register(Box::new(ListRangeTool::new(Arc::clone(&store))));
        registry.register(Box::new(MarkDoneTool::new(Arc::clone(&store))));
        registry.register(Box::new(SnoozeTool::new(store)));
        registry
    }
}

/// One listing line per task.
pub(crate) fn task_line(task: &Task) -> String {
    format!(
        "- [{}] {} (Due: {} {})",
        task.status,
        task.title,
        task.due_date.as_deref().unwrap_or("N/A"),
        task.due_time.as_deref().unwrap_or("")
    )
}

/// Schema property shared by every task tool.
pub(crate) fn owner_id_property() -> Value {
    serde_json::json!({
        "type": "string",
        "description": "The ID of the task owner"
    })
}

#[cfg(test)]
mod tests;
