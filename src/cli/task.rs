//! Direct task management from the command line.
//!
//! Reads and writes the same task file the tool server serves, so tasks
//! created here are visible to the assistant and the other way around.

use anyhow::Result;
use chrono::{Local, NaiveDate, NaiveTime};
use clap::Subcommand;
use colored::Colorize;

use crate::output;
use crate::store::{NewTask, TaskStore};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a task
    Add {
        title: Vec<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        date: Option<String>,
        /// Due time (HH:MM)
        #[arg(long, value_parser = parse_time)]
        time: Option<String>,
    },
    /// List tasks due on one day (defaults to today)
    Day {
        #[arg(value_parser = parse_date)]
        date: Option<String>,
    },
    /// List tasks due within an inclusive range
    Range {
        #[arg(value_parser = parse_date)]
        start: String,
        #[arg(value_parser = parse_date)]
        end: String,
    },
    /// Mark a task as done
    Done { id: String },
    /// Move a task to another date and/or time
    Snooze {
        id: String,
        #[arg(long, value_parser = parse_date)]
        date: Option<String>,
        #[arg(long, value_parser = parse_time)]
        time: Option<String>,
    },
}

fn parse_date(s: &str) -> Result<String, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| format!("expected YYYY-MM-DD, got '{s}'"))
}

fn parse_time(s: &str) -> Result<String, String> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| format!("expected HH:MM, got '{s}'"))
}

/// Dispatches a `task` subcommand for `owner`.
pub fn handle_task(store: &TaskStore, owner: &str, action: TaskAction) -> Result<()> {
    match action {
        TaskAction::Add {
            title,
            description,
            date,
            time,
        } => {
            let title = title.join(" ");
            if title.trim().is_empty() {
                anyhow::bail!("No title provided. Usage: notifly task add \"Dentista\" --date 2024-03-06");
            }
            let task = store.create(NewTask {
                owner_id: owner.to_string(),
                title,
                description,
                due_date: date,
                due_time: time,
                status: None,
            })?;
            println!("{} {}", "Created".green().bold(), task.task_id);
            output::render_task(&task);
        }
        TaskAction::Day { date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive().format("%Y-%m-%d").to_string());
            let tasks = store.list_for_day(owner, &date)?;
            output::render_tasks(&tasks, &format!("No tasks found for {date}."));
        }
        TaskAction::Range { start, end } => {
            if start > end {
                anyhow::bail!("Invalid range: {} is after {}", start, end);
            }
            let tasks = store.list_for_range(owner, &start, &end)?;
            output::render_tasks(&tasks, &format!("No tasks found from {start} to {end}."));
        }
        TaskAction::Done { id } => match store.mark_done(owner, &id)? {
            Some(task) => output::render_task(&task),
            None => anyhow::bail!("Task with ID {} not found.", id),
        },
        TaskAction::Snooze { id, date, time } => {
            if date.is_none() && time.is_none() {
                anyhow::bail!("Nothing to change: pass --date and/or --time");
            }
            match store.snooze(owner, &id, date, time)? {
                Some(task) => output::render_task(&task),
                None => anyhow::bail!("Task with ID {} not found.", id),
            }
        }
    }
    Ok(())
}
