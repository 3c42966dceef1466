use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{owner_id_property, task_line, Tool, ToolResult};
use crate::store::TaskStore;

pub struct ListRangeTool {
    store: Arc<TaskStore>,
}

impl ListRangeTool {
    pub fn new(store: Arc<TaskStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct ListRangeInput {
    owner_id: String,
    start: String,
    end: String,
}

#[async_trait::async_trait]
impl Tool for ListRangeTool {
    fn name(&self) -> &str {
        "listRange"
    }

    fn description(&self) -> &str {
        "Retrieve all tasks within a specified date range"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "owner_id": owner_id_property(),
                "start": {
                    "type": "string",
                    "description": "The start date in YYYY-MM-DD format"
                },
                "end": {
                    "type": "string",
                    "description": "The end date in YYYY-MM-DD format"
                }
            },
            "required": ["owner_id", "start", "end"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let input: ListRangeInput = serde_json::from_value(input)?;
        if input.start > input.end {
            return Ok(ToolResult::error(format!(
                "Invalid range: {} is after {}.",
                input.start, input.end
            )));
        }
        let tasks = self
            .store
            .list_for_range(&input.owner_id, &input.start, &input.end)?;
        if tasks.is_empty() {
            return Ok(ToolResult::success(format!(
                "No tasks found from {} to {}.",
                input.start, input.end
            )));
        }
        Ok(ToolResult::lines(tasks.iter().map(task_line).collect()))
    }
}
