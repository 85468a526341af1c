//! Error types for doc-extractor
//!
//! This module provides the error taxonomy for the service:
//! - Client-facing errors (invalid input, unknown task) that never create a task
//! - Task store errors, including invariant violations (`InvalidTransition`)
//! - Pipeline stage errors that the runner turns into `failed` tasks
//! - HTTP status code mapping and the JSON error body used by the API

use crate::types::{OutputMode, TaskId, TaskState};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for doc-extractor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for doc-extractor
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "DOC_EXTRACTOR_BIND_ADDRESS")
        key: Option<String>,
    },

    /// Malformed request (bad mode, bad URL, unreadable body)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Generic resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Task store error
    #[error("task error: {0}")]
    Task(#[from] TaskError),

    /// Pipeline stage error (fetch, extract, convert)
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Shutdown in progress - not accepting new tasks
    #[error("shutdown in progress: not accepting new tasks")]
    ShuttingDown,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Task store errors
#[derive(Debug, Error)]
pub enum TaskError {
    /// Unknown task identifier
    #[error("task {id} not found")]
    NotFound {
        /// The task ID that was not found
        id: TaskId,
    },

    /// A state change that violates the task lifecycle
    ///
    /// Only the owning job transitions a task, so this indicates a bug.
    #[error("invalid transition for task {id} from {from} to {to}: {reason}")]
    InvalidTransition {
        /// The task being transitioned
        id: TaskId,
        /// The current state
        from: TaskState,
        /// The requested state
        to: TaskState,
        /// Which rule was violated
        reason: String,
    },

    /// The artifact is requested before the task completed
    #[error("task {id} is {state}, artifact not ready")]
    NotReady {
        /// The task ID
        id: TaskId,
        /// The current state
        state: TaskState,
    },

    /// Operation not allowed on a finished task
    #[error("task {id} already {state}")]
    AlreadyTerminal {
        /// The task ID
        id: TaskId,
        /// The terminal state
        state: TaskState,
    },
}

/// Pipeline stage errors
///
/// The runner catches these at the job boundary and records them as the
/// `message` of a failed task.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Remote archive could not be retrieved
    #[error("failed to fetch {url}: {reason}")]
    FetchFailed {
        /// The URL being fetched
        url: String,
        /// The reason the fetch failed
        reason: String,
    },

    /// Archive extraction failed
    #[error("extraction failed for {archive}: {reason}")]
    ExtractionFailed {
        /// The archive file that failed to extract
        archive: PathBuf,
        /// The reason extraction failed
        reason: String,
    },

    /// Archive entry would escape the extraction directory
    #[error("unsafe archive entry '{entry}' in {archive}")]
    UnsafeArchiveEntry {
        /// The archive containing the entry
        archive: PathBuf,
        /// The offending entry name
        entry: String,
    },

    /// Nothing in the archive could be converted
    #[error("no convertible content for {mode} output")]
    NoConvertibleContent {
        /// The requested mode
        mode: OutputMode,
    },

    /// Writing the artifact failed
    #[error("conversion failed: {reason}")]
    ConversionFailed {
        /// The reason conversion failed
        reason: String,
    },

    /// Task was cancelled
    #[error("cancelled")]
    Cancelled,
}

/// API error response format
///
/// ```json
/// {
///   "error": {
///     "code": "task_not_found",
///     "message": "task 5f0c... not found",
///     "details": { "task_id": "5f0c..." }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "invalid_input")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::InvalidInput(_) => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,
            Error::Task(TaskError::NotFound { .. }) => 404,

            // 409 Conflict - Task not in a state that allows the operation
            Error::Task(TaskError::NotReady { .. }) => 409,
            Error::Task(TaskError::AlreadyTerminal { .. }) => 409,

            // 500 - Lifecycle invariant broken
            Error::Task(TaskError::InvalidTransition { .. }) => 500,

            // 422 Unprocessable Entity - Pipeline errors surfaced directly
            Error::Pipeline(_) => 422,

            // 500 Internal Server Error - Server-side issues
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - External service errors
            Error::Network(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidInput(_) => "invalid_input",
            Error::NotFound(_) => "not_found",
            Error::Task(e) => match e {
                TaskError::NotFound { .. } => "task_not_found",
                TaskError::InvalidTransition { .. } => "invalid_transition",
                TaskError::NotReady { .. } => "task_not_ready",
                TaskError::AlreadyTerminal { .. } => "task_already_terminal",
            },
            Error::Pipeline(e) => match e {
                PipelineError::FetchFailed { .. } => "fetch_failed",
                PipelineError::ExtractionFailed { .. } => "extraction_failed",
                PipelineError::UnsafeArchiveEntry { .. } => "unsafe_archive_entry",
                PipelineError::NoConvertibleContent { .. } => "no_convertible_content",
                PipelineError::ConversionFailed { .. } => "conversion_failed",
                PipelineError::Cancelled => "cancelled",
            },
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::ShuttingDown => "shutting_down",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Task(TaskError::NotFound { id }) => Some(serde_json::json!({
                "task_id": id,
            })),
            Error::Task(TaskError::NotReady { id, state })
            | Error::Task(TaskError::AlreadyTerminal { id, state }) => Some(serde_json::json!({
                "task_id": id,
                "status": state,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::Pipeline(PipelineError::UnsafeArchiveEntry { entry, .. }) => {
                Some(serde_json::json!({
                    "entry": entry,
                }))
            }
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
