use anyhow::Result;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{owner_id_property, Tool, ToolResult};
use crate::store::{NewTask, TaskStore};

pub struct AddTool {
    store: Arc<TaskStore>,
}

impl AddTool {
    pub fn new(store: Arc<TaskStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for AddTool {
    fn name(&self) -> &str {
        "add"
    }

    fn description(&self) -> &str {
        "Create a new task in the NotiFly system"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "owner_id": owner_id_property(),
                "title": {
                    "type": "string",
                    "description": "The title of the task"
                },
                "description": {
                    "type": "string",
                    "description": "The description of the task"
                },
                "due_date": {
                    "type": "string",
                    "description": "The due date of the task in YYYY-MM-DD format"
                },
                "due_time": {
                    "type": "string",
                    "description": "The due time of the task in HH:MM format"
                },
                "status": {
                    "type": "string",
                    "description": "The status of the task (default is 'pending')"
                }
            },
            "required": ["owner_id", "title"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let new: NewTask = match serde_json::from_value(input) {
            Ok(new) => new,
            Err(e) => return Ok(ToolResult::error(format!("Error creating task: {}", e))),
        };
        match self.store.create(new) {
            Ok(task) => Ok(ToolResult::success(format!(
                "Task \"{}\" added successfully with ID: {}",
                task.title, task.task_id
            ))),
            Err(e) => {
                tracing::warn!(error = %e, "add failed");
                Ok(ToolResult::error(format!("Error creating task: {}", e)))
            }
        }
    }
}
