//! Core types for doc-extractor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::Error;

/// Unique identifier for an extraction task
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Allocate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID value
    pub fn get(&self) -> Uuid {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TaskId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Task lifecycle state
///
/// `Pending` is the only initial state; `Completed` and `Failed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Created, waiting for the runner to claim it
    Pending,
    /// Fetch, extract or convert in progress
    Processing,
    /// Artifact produced
    Completed,
    /// A stage failed or the task was cancelled
    Failed,
}

impl TaskState {
    /// Whether no further transitions are permitted
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }

    /// Wire name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Processing => "processing",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested artifact format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Single merged PDF (default)
    #[default]
    Pdf,
    /// Concatenated plain text
    Txt,
}

impl OutputMode {
    /// File extension of the artifact
    pub fn extension(&self) -> &'static str {
        match self {
            OutputMode::Pdf => "pdf",
            OutputMode::Txt => "txt",
        }
    }

    /// MIME type used when serving the artifact
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputMode::Pdf => "application/pdf",
            OutputMode::Txt => "text/plain; charset=utf-8",
        }
    }
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for OutputMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(OutputMode::Pdf),
            "txt" => Ok(OutputMode::Txt),
            other => Err(Error::InvalidInput(format!(
                "unsupported mode '{}': expected \"pdf\" or \"txt\"",
                other
            ))),
        }
    }
}

/// One extraction request and its lifecycle
///
/// `output_path` is present if and only if `state` is [`TaskState::Completed`];
/// the store enforces this on every transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Task identifier
    pub id: TaskId,
    /// Current lifecycle state
    pub state: TaskState,
    /// Requested artifact format
    pub mode: OutputMode,
    /// URL of the archive to fetch
    pub source_url: String,
    /// Progress note or failure reason
    pub message: String,
    /// Location of the artifact once completed
    pub output_path: Option<PathBuf>,
    /// When the task was created
    pub created_at: DateTime<Utc>,
    /// When the task last changed
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Build a fresh pending task
    pub fn pending(mode: OutputMode, source_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::new(),
            state: TaskState::Pending,
            mode,
            source_url: source_url.into(),
            message: "extraction queued".to_string(),
            output_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the task reached `completed` or `failed`
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// A requested state change, applied atomically by a [`TaskStore`](crate::store::TaskStore)
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    /// Target state
    pub state: TaskState,
    /// New message (replaces the previous one)
    pub message: String,
    /// Artifact location, required for `completed` and forbidden otherwise
    pub output_path: Option<PathBuf>,
}

impl Transition {
    /// Move to (or stay in) `processing` with a progress note
    pub fn processing(message: impl Into<String>) -> Self {
        Self {
            state: TaskState::Processing,
            message: message.into(),
            output_path: None,
        }
    }

    /// Finish successfully, recording the artifact path
    pub fn completed(message: impl Into<String>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            state: TaskState::Completed,
            message: message.into(),
            output_path: Some(output_path.into()),
        }
    }

    /// Finish with an error
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            state: TaskState::Failed,
            message: message.into(),
            output_path: None,
        }
    }
}

/// Pipeline stage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Download of the remote archive
    Fetch,
    /// Archive unpacking
    Extract,
    /// Artifact rendering
    Convert,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::Fetch => "fetch",
            Stage::Extract => "extract",
            Stage::Convert => "convert",
        })
    }
}

/// Archive type detected by magic bytes or file extension
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveType {
    /// ZIP archive (.zip)
    Zip,
    /// Uncompressed tar (.tar)
    Tar,
    /// Gzip-compressed tar (.tar.gz, .tgz)
    TarGz,
    /// 7-Zip archive (.7z)
    SevenZip,
    /// RAR archive, v4 or v5 (.rar)
    Rar,
}

/// Event emitted by the runner whenever a task changes
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    /// Task created in `pending`
    Created {
        /// Task ID
        id: TaskId,
        /// Requested mode
        mode: OutputMode,
    },
    /// Task entered or advanced within `processing`
    Progress {
        /// Task ID
        id: TaskId,
        /// Progress note
        message: String,
    },
    /// Task completed
    Completed {
        /// Task ID
        id: TaskId,
        /// Artifact location
        output_path: PathBuf,
    },
    /// Task failed
    Failed {
        /// Task ID
        id: TaskId,
        /// Failure reason
        message: String,
    },
    /// Service is shutting down
    Shutdown,
}

impl TaskEvent {
    /// Event name used for server-sent events
    pub fn name(&self) -> &'static str {
        match self {
            TaskEvent::Created { .. } => "created",
            TaskEvent::Progress { .. } => "progress",
            TaskEvent::Completed { .. } => "completed",
            TaskEvent::Failed { .. } => "failed",
            TaskEvent::Shutdown => "shutdown",
        }
    }

    /// Task the event refers to, if any
    pub fn task_id(&self) -> Option<TaskId> {
        match self {
            TaskEvent::Created { id, .. }
            | TaskEvent::Progress { id, .. }
            | TaskEvent::Completed { id, .. }
            | TaskEvent::Failed { id, .. } => Some(*id),
            TaskEvent::Shutdown => None,
        }
    }
}
