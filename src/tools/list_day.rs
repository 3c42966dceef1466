use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{owner_id_property, task_line, Tool, ToolResult};
use crate::store::TaskStore;

pub struct ListDayTool {
    store: Arc<TaskStore>,
}

impl ListDayTool {
    pub fn new(store: Arc<TaskStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct ListDayInput {
    owner_id: String,
    date: String,
}

#[async_trait::async_trait]
impl Tool for ListDayTool {
    fn name(&self) -> &str {
        "listDay"
    }

    fn description(&self) -> &str {
        "Retrieve all tasks for a given day"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "owner_id": owner_id_property(),
                "date": {
                    "type": "string",
                    "description": "The date to list tasks for in YYYY-MM-DD format"
                }
            },
            "required": ["owner_id", "date"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let input: ListDayInput = serde_json::from_value(input)?;
        let tasks = self.store.list_for_day(&input.owner_id, &input.date)?;
        if tasks.is_empty() {
            return Ok(ToolResult::success(format!(
                "No tasks found for {}.",
                input.date
            )));
        }
        Ok(ToolResult::lines(tasks.iter().map(task_line).collect()))
    }
}
