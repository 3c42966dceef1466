use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{owner_id_property, Tool, ToolResult};
use crate::store::TaskStore;

pub struct MarkDoneTool {
    store: Arc<TaskStore>,
}

impl MarkDoneTool {
    pub fn new(store: Arc<TaskStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct MarkDoneInput {
    owner_id: String,
    task_id: String,
}

#[async_trait::async_trait]
impl Tool for MarkDoneTool {
    fn name(&self) -> &str {
        "markDone"
    }

    fn description(&self) -> &str {
        "Mark an existing task as completed"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "owner_id": owner_id_property(),
                "task_id": {
                    "type": "string",
                    "description": "The ID of the task to mark as done"
                }
            },
            "required": ["owner_id", "task_id"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let input: MarkDoneInput = serde_json::from_value(input)?;
        match self.store.mark_done(&input.owner_id, &input.task_id)? {
            Some(task) => Ok(ToolResult::success(format!(
                "Task \"{}\" marked as done.",
                task.title
            ))),
            None => Ok(ToolResult::success(format!(
                "Task with ID {} not found.",
                input.task_id
            ))),
        }
    }
}
