//! Task store: the single source of truth for task state
//!
//! [`TaskStore`] is the persistence seam. The shipped [`InMemoryTaskStore`]
//! keeps records in a process-wide map; a durable backend only has to
//! implement the same four operations with the same validation.

use crate::error::{Error, Result, TaskError};
use crate::types::{OutputMode, Task, TaskId, TaskState, Transition};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Storage contract for task records
///
/// Implementations must be safe under concurrent callers and must apply each
/// transition atomically: a reader sees either the old record or the new one.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Allocate a fresh `pending` task
    async fn create(&self, mode: OutputMode, source_url: &str) -> Result<Task>;

    /// Fetch a snapshot of a task
    async fn get(&self, id: TaskId) -> Result<Task>;

    /// Apply a validated state change and return the updated snapshot
    async fn transition(&self, id: TaskId, transition: Transition) -> Result<Task>;

    /// Snapshot of every task, newest first
    async fn list(&self) -> Result<Vec<Task>>;

    /// Name of this backend (for logging)
    fn name(&self) -> &str;
}

/// Check a transition against the task lifecycle
///
/// Shared by every [`TaskStore`] implementation so the rules live in one place.
pub fn validate_transition(task: &Task, transition: &Transition) -> Result<()> {
    let reject = |reason: &str| -> Result<()> {
        Err(Error::Task(TaskError::InvalidTransition {
            id: task.id,
            from: task.state,
            to: transition.state,
            reason: reason.to_string(),
        }))
    };

    if task.state.is_terminal() {
        return reject("task is already terminal");
    }

    match (task.state, transition.state) {
        (_, TaskState::Pending) => return reject("cannot return to pending"),
        (TaskState::Pending, TaskState::Completed) => {
            return reject("task must be processing before it can complete");
        }
        _ => {}
    }

    match transition.state {
        TaskState::Completed if transition.output_path.is_none() => {
            return reject("completed transition requires an output path");
        }
        TaskState::Processing | TaskState::Failed if transition.output_path.is_some() => {
            return reject("only a completed transition may carry an output path");
        }
        _ => {}
    }

    if matches!(transition.state, TaskState::Processing | TaskState::Failed)
        && transition.message.trim().is_empty()
    {
        return reject("message must not be empty");
    }

    Ok(())
}

/// In-memory task store
///
/// Records live in a `RwLock<HashMap>`; transitions validate and replace the
/// record while holding the write lock.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<TaskId, Task>>,
}

impl InMemoryTaskStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, mode: OutputMode, source_url: &str) -> Result<Task> {
        let mut tasks = self.tasks.write().await;
        let mut task = Task::pending(mode, source_url);
        while tasks.contains_key(&task.id) {
            task.id = TaskId::new();
        }
        tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn get(&self, id: TaskId) -> Result<Task> {
        self.tasks
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(Error::Task(TaskError::NotFound { id }))
    }

    async fn transition(&self, id: TaskId, transition: Transition) -> Result<Task> {
        let mut tasks = self.tasks.write().await;
        let current = tasks
            .get(&id)
            .ok_or(Error::Task(TaskError::NotFound { id }))?;

        validate_transition(current, &transition)?;

        let updated = Task {
            state: transition.state,
            message: transition.message,
            output_path: transition.output_path,
            updated_at: Utc::now(),
            ..current.clone()
        };
        tasks.insert(id, updated.clone());
        Ok(updated)
    }

    async fn list(&self) -> Result<Vec<Task>> {
        let mut all: Vec<Task> = self.tasks.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(all)
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
