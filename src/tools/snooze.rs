use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{owner_id_property, Tool, ToolResult};
use crate::store::TaskStore;

/// Moves a task to a new date and/or time.
pub struct SnoozeTool {
    store: Arc<TaskStore>,
}

impl SnoozeTool {
    pub fn new(store: Arc<TaskStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct SnoozeInput {
    owner_id: String,
    task_id: String,
    #[serde(default)]
    new_due_date: Option<String>,
    #[serde(default)]
    new_due_time: Option<String>,
}

#[async_trait::async_trait]
impl Tool for SnoozeTool {
    fn name(&self) -> &str {
        "snooze"
    }

    fn description(&self) -> &str {
        "Postpone an existing task to a new date and/or time"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "owner_id": owner_id_property(),
                "task_id": {
                    "type": "string",
                    "description": "The ID of the task to postpone"
                },
                "new_due_date": {
                    "type": "string",
                    "description": "The new due date in YYYY-MM-DD format"
                },
                "new_due_time": {
                    "type": "string",
                    "description": "The new due time in HH:MM format"
                }
            },
            "required": ["owner_id", "task_id"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let input: SnoozeInput = serde_json::from_value(input)?;
        let new_date = input.new_due_date.filter(|s| !s.is_empty());
        let new_time = input.new_due_time.filter(|s| !s.is_empty());
        if new_date.is_none() && new_time.is_none() {
            return Ok(ToolResult::error(
                "Nothing to change: provide new_due_date or new_due_time.",
            ));
        }
        match self
            .store
            .snooze(&input.owner_id, &input.task_id, new_date, new_time)?
        {
            Some(task) => Ok(ToolResult::success(format!(
                "Task \"{}\" moved to {} {}.",
                task.title,
                task.due_date.as_deref().unwrap_or("N/A"),
                task.due_time.as_deref().unwrap_or("")
            ))),
            None => Ok(ToolResult::success(format!(
                "Task with ID {} not found.",
                input.task_id
            ))),
        }
    }
}
