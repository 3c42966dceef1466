//! Terminal rendering for the CLI.
//!
//! Only user-facing results go to stdout. Diagnostics go through `tracing`
//! to stderr.

use colored::Colorize;

use crate::provider::ModelToolSpec;
use crate::store::{Task, STATUS_DONE};

/// Prints the user's prompt and the assistant's reply.
pub fn render_exchange(user: &str, prompt: &str, reply: &str) {
    println!("{} {}", format!("{user}>").green().bold(), prompt);
    println!();
    println!("{} {}", "notifly>".cyan().bold(), reply);
}

/// Prints the tool set exactly as the model sees it.
pub fn render_tools(server: &str, tools: &[ModelToolSpec]) {
    println!("{} {}", "Tool server:".bold(), server);
    println!();
    for tool in tools {
        println!("  {}  {}", tool.function.name.yellow(), tool.function.description.dimmed());
        let params = &tool.function.parameters;
        let required: Vec<&str> = params["required"]
            .as_array()
            .map(|r| r.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();
        if let Some(props) = params["properties"].as_object() {
            for name in props.keys() {
                let marker = if required.contains(&name.as_str()) { "*" } else { "" };
                println!("      {name}{marker}");
            }
        }
    }
}

pub fn render_models(base_url: &str, current: &str, models: &[String]) {
    println!("{} {}", "Models at".bold(), base_url);
    println!();
    if models.is_empty() {
        println!("  (no models loaded)");
        return;
    }
    for model in models {
        let marker = if model == current { " (configured)" } else { "" };
        println!("  {model}{}", marker.green());
    }
}

pub fn render_tasks(tasks: &[Task], empty_message: &str) {
    if tasks.is_empty() {
        println!("{}", empty_message.dimmed());
        return;
    }
    for task in tasks {
        render_task(task);
    }
}

pub fn render_task(task: &Task) {
    let status = if task.status == STATUS_DONE {
        task.status.green()
    } else {
        task.status.yellow()
    };
    let when = match (&task.due_date, &task.due_time) {
        (Some(date), Some(time)) => format!("{date} {time}"),
        (Some(date), None) => date.clone(),
        (None, _) => "no date".to_string(),
    };
    println!(
        "[{}] {}  {}  {}",
        status,
        task.title.bold(),
        when,
        task.task_id.dimmed()
    );
}
