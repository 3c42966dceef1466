//! Task persistence for the tool server.
//!
//! Tasks live in a single pretty-printed JSON file. Every mutation rewrites
//! the file before returning, so a crashed tool process loses nothing that
//! it already acknowledged.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status given to tasks created without one.
pub const STATUS_PENDING: &str = "pending";

/// Status set by [`TaskStore::mark_done`].
pub const STATUS_DONE: &str = "done";

/// A scheduled task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub owner_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// `YYYY-MM-DD`.
    #[serde(default)]
    pub due_date: Option<String>,
    /// `HH:MM`.
    #[serde(default)]
    pub due_time: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields accepted when creating a task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    pub owner_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub due_time: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TaskFile {
    tasks: Vec<Task>,
}

pub struct TaskStore {
    path: PathBuf,
    tasks: Mutex<Vec<Task>>,
}

impl TaskStore {
    /// Opens the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let tasks = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read task store {:?}", path))?;
            if contents.trim().is_empty() {
                Vec::new()
            } else {
                let file: TaskFile = serde_json::from_str(&contents)
                    .with_context(|| format!("Failed to parse task store {:?}", path))?;
                file.tasks
            }
        } else {
            Vec::new()
        };
        Ok(Self {
            path,
            tasks: Mutex::new(tasks),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Task>>> {
        self.tasks
            .lock()
            .map_err(|_| anyhow!("Task store lock poisoned"))
    }

    fn persist(&self, tasks: &[Task]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&TaskFile {
            tasks: tasks.to_vec(),
        })?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write task store {:?}", self.path))
    }

    pub fn create(&self, new: NewTask) -> Result<Task> {
        anyhow::ensure!(!new.owner_id.trim().is_empty(), "owner_id is required");
        anyhow::ensure!(!new.title.trim().is_empty(), "title is required");

        let now = Utc::now().to_rfc3339();
        let task = Task {
            task_id: Uuid::new_v4().to_string(),
            owner_id: new.owner_id,
            title: new.title,
            description: new.description,
            due_date: new.due_date,
            due_time: new.due_time,
            status: new.status.unwrap_or_else(|| STATUS_PENDING.to_string()),
            created_at: now.clone(),
            updated_at: now,
        };

        let mut tasks = self.lock()?;
        let mut next = tasks.clone();
        next.push(task.clone());
        self.persist(&next)?;
        *tasks = next;
        Ok(task)
    }

    /// Tasks of `owner_id` due on `date`, ordered by due time. Untimed
    /// tasks come last.
    pub fn list_for_day(&self, owner_id: &str, date: &str) -> Result<Vec<Task>> {
        self.list_where(owner_id, |due| due == date)
    }

    /// Tasks of `owner_id` due within `start..=end`, ordered by date then time.
    pub fn list_for_range(&self, owner_id: &str, start: &str, end: &str) -> Result<Vec<Task>> {
        self.list_where(owner_id, |due| due >= start && due <= end)
    }

    fn list_where(&self, owner_id: &str, due_matches: impl Fn(&str) -> bool) -> Result<Vec<Task>> {
        let tasks = self.lock()?;
        let mut found: Vec<Task> = tasks
            .iter()
            .filter(|t| t.owner_id == owner_id)
            .filter(|t| t.due_date.as_deref().is_some_and(&due_matches))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            let key = |t: &Task| (t.due_date.clone(), t.due_time.is_none(), t.due_time.clone());
            key(a).cmp(&key(b))
        });
        Ok(found)
    }

    /// Marks a task done. Returns `None` when `owner_id` has no such task.
    pub fn mark_done(&self, owner_id: &str, task_id: &str) -> Result<Option<Task>> {
        self.update(owner_id, task_id, |task| {
            task.status = STATUS_DONE.to_string();
        })
    }

    /// Moves a task. Only the provided fields change.
    pub fn snooze(
        &self,
        owner_id: &str,
        task_id: &str,
        new_due_date: Option<String>,
        new_due_time: Option<String>,
    ) -> Result<Option<Task>> {
        self.update(owner_id, task_id, |task| {
            if let Some(date) = new_due_date {
                task.due_date = Some(date);
            }
            if let Some(time) = new_due_time {
                task.due_time = Some(time);
            }
        })
    }

    fn update(
        &self,
        owner_id: &str,
        task_id: &str,
        apply: impl FnOnce(&mut Task),
    ) -> Result<Option<Task>> {
        let mut tasks = self.lock()?;
        let Some(index) = tasks
            .iter()
            .position(|t| t.task_id == task_id && t.owner_id == owner_id)
        else {
            return Ok(None);
        };
        let mut next = tasks.clone();
        let task = &mut next[index];
        apply(task);
        task.updated_at = Utc::now().to_rfc3339();
        let updated = task.clone();
        self.persist(&next)?;
        *tasks = next;
        Ok(Some(updated))
    }
}
