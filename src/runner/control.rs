//! Task queries and control: status, artifact lookup, cancellation.

use crate::error::{Error, Result, TaskError};
use crate::types::{OutputMode, Task, TaskId, TaskState};
use std::path::PathBuf;

use super::DocumentExtractor;

/// An opened artifact of a completed task
///
/// The file is opened once; callers stream from this handle so a concurrent
/// reaper deleting the path cannot truncate an in-flight response.
#[derive(Debug)]
pub struct Artifact {
    /// Owning task
    pub task_id: TaskId,
    /// Artifact format
    pub mode: OutputMode,
    /// Location the artifact was written to
    pub path: PathBuf,
    /// Open handle
    pub file: tokio::fs::File,
    /// Size in bytes, taken from the open handle
    pub len: u64,
}

impl DocumentExtractor {
    /// Current snapshot of a task
    pub async fn status(&self, id: TaskId) -> Result<Task> {
        self.store.get(id).await
    }

    /// Every task, newest first
    pub async fn list(&self) -> Result<Vec<Task>> {
        self.store.list().await
    }

    /// Open the artifact of a completed task
    ///
    /// # Errors
    ///
    /// - `TaskError::NotFound` for an unknown task
    /// - `TaskError::NotReady` when the task is not `completed`
    /// - `Error::NotFound` when the artifact was removed from disk
    pub async fn artifact(&self, id: TaskId) -> Result<Artifact> {
        let task = self.store.get(id).await?;

        let path = match (task.state, task.output_path) {
            (TaskState::Completed, Some(path)) => path,
            (state, _) => return Err(Error::Task(TaskError::NotReady { id, state })),
        };

        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(task_id = %id, ?path, "artifact missing from disk");
                return Err(Error::NotFound(format!("artifact for task {}", id)));
            }
            Err(e) => return Err(Error::Io(e)),
        };
        let len = file.metadata().await?.len();

        Ok(Artifact {
            task_id: id,
            mode: task.mode,
            path,
            file,
            len,
        })
    }

    /// Request cancellation of a task
    ///
    /// Signals the task's job, which records `failed` with message
    /// `cancelled` at its next checkpoint. Returns the snapshot at the time
    /// of the request.
    ///
    /// # Errors
    ///
    /// - `TaskError::NotFound` for an unknown task
    /// - `TaskError::AlreadyTerminal` when the task already finished
    pub async fn cancel(&self, id: TaskId) -> Result<Task> {
        let task = self.store.get(id).await?;
        if task.is_terminal() {
            return Err(Error::Task(TaskError::AlreadyTerminal {
                id,
                state: task.state,
            }));
        }

        let active = self.job_state.active_tasks.lock().await;
        match active.get(&id) {
            Some(token) => {
                tracing::info!(task_id = %id, state = %task.state, "cancellation requested");
                token.cancel();
            }
            None => {
                tracing::debug!(task_id = %id, "cancel requested for task without an active job");
            }
        }

        Ok(task)
    }
}
