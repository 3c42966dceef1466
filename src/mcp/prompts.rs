//! Prompt templates served over `prompts/list` and `prompts/get`.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use serde_json::{json, Value};

pub const SMART_TASK_PLANNER: &str = "smart_task_planner";

/// `prompts/list` entry for every served prompt.
pub fn descriptors() -> Vec<Value> {
    vec![json!({
        "name": SMART_TASK_PLANNER,
        "title": "Smart task planner",
        "description": "Plan the user's tasks intelligently even from a vague request",
        "arguments": [
            {
                "name": "owner_id",
                "description": "The ID of the task owner",
                "required": true
            },
            {
                "name": "raw_input",
                "description": "The original, possibly vague, user request about their tasks",
                "required": true
            },
            {
                "name": "today",
                "description": "Today's date in YYYY-MM-DD format",
                "required": false
            }
        ]
    })]
}

#[derive(Debug, Deserialize)]
struct PlannerArgs {
    owner_id: String,
    raw_input: String,
    #[serde(default)]
    today: Option<String>,
}

/// Renders `name` with `arguments` into a `prompts/get` result.
pub fn render(name: &str, arguments: Value) -> Result<Value> {
    if name != SMART_TASK_PLANNER {
        return Err(anyhow!("Unknown prompt: {}", name));
    }
    let args: PlannerArgs = serde_json::from_value(arguments)
        .map_err(|e| anyhow!("Invalid arguments for {}: {}", name, e))?;

    Ok(json!({
        "description": "Plan the user's tasks intelligently even from a vague request",
        "messages": [
            {
                "role": "assistant",
                "content": { "type": "text", "text": planner_text(&args) }
            },
            {
                "role": "user",
                "content": { "type": "text", "text": args.raw_input }
            }
        ]
    }))
}

fn planner_text(args: &PlannerArgs) -> String {
    let today = args.today.as_deref().unwrap_or("not provided");
    format!(
        r#"You are NotiFly, an intelligent task planning assistant.

Your goals:
- Interpret vague, messy user requests about tasks and schedules.
- When needed, ask short, objective clarification questions.
- Use the available tools to read and modify the user's tasks.
- Return a clear, structured plan for the user.

Available tools (MCP):
- "add": create a new task for the user.
- "listDay": list all tasks for a given day.
- "listRange": inspect tasks across a date range.
- "markDone": mark an existing task as done.
- "snooze": move an existing task to another date or time.

Behavior guidelines:
- If the user says things like "joga isso pra amanhã", interpret dates relative to "today" if provided.
- Prefer to look at the user's tasks (via listDay or listRange) before making big changes.
- If the request is too ambiguous (for example, you don't know which task they mean), ask 1-2 clarification questions instead of guessing.
- Always explain briefly what you did (e.g. which tasks were moved or completed).

Context:
- owner_id: {owner}
- today (if provided): {today}

Now the user sent this request (possibly vague), and you must understand what they want and decide how to use the tools above:

"{input}""#,
        owner = args.owner_id,
        today = today,
        input = args.raw_input,
    )
}
