//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`tasks`] — Task creation, status, cancellation and listing
//! - [`artifacts`] — Artifact delivery (inline view and download)
//! - [`system`] — Health, events, OpenAPI

use crate::error::{Error, Result};
use crate::types::{Task, TaskId, TaskState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod artifacts;
mod system;
mod tasks;

// Re-export all handlers so `routes::function_name` continues to work
pub use artifacts::*;
pub use system::*;
pub use tasks::*;

// ============================================================================
// Request/Response Types (shared across handlers)
// ============================================================================

/// Request body for POST /extract
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CreateTaskRequest {
    /// Archive URL (http or https)
    pub url: String,
    /// Output format: "pdf" (default) or "txt"
    #[serde(default)]
    pub mode: Option<String>,
}

/// Short task acknowledgement returned by POST /extract and POST /cancel/:task_id
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct TaskAck {
    /// Task identifier
    #[schema(value_type = String)]
    pub task_id: TaskId,
    /// Current state
    pub status: TaskState,
    /// Current message
    pub message: String,
}

impl From<&Task> for TaskAck {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id,
            status: task.state,
            message: task.message.clone(),
        }
    }
}

/// Full task snapshot returned by GET /status/:task_id and GET /tasks
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct TaskStatusResponse {
    /// Task identifier
    #[schema(value_type = String)]
    pub task_id: TaskId,
    /// Current state
    pub status: TaskState,
    /// Progress, success or failure message
    pub message: String,
    /// Requested output format
    pub mode: crate::types::OutputMode,
    /// Archive URL as submitted
    pub source_url: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Time of the last transition
    pub updated_at: DateTime<Utc>,
    /// Artifact location, present only once completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

impl From<Task> for TaskStatusResponse {
    fn from(task: Task) -> Self {
        Self {
            task_id: task.id,
            status: task.state,
            message: task.message,
            mode: task.mode,
            source_url: task.source_url,
            created_at: task.created_at,
            updated_at: task.updated_at,
            file_path: task.output_path.map(|p| p.display().to_string()),
        }
    }
}

/// Parse a task id path segment
///
/// A segment that is not a UUID cannot name any task, so it reads as not found.
pub(crate) fn parse_task_id(raw: &str) -> Result<TaskId> {
    raw.parse::<TaskId>()
        .map_err(|_| Error::NotFound(format!("task {}", raw)))
}
