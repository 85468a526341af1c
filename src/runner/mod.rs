//! Job runner: the `DocumentExtractor` service
//!
//! The `DocumentExtractor` struct and its methods are organized by domain:
//! - [`pipeline`] - Per-task job execution (fetch, extract, convert)
//! - [`control`] - Status, artifact lookup and cancellation
//! - [`lifecycle`] - Shutdown coordination

mod control;
mod lifecycle;
mod pipeline;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use control::Artifact;

use crate::config::Config;
use crate::conversion::{BuiltinConverter, Converter};
use crate::error::{Error, Result};
use crate::fetch::{Fetcher, validate_url};
use crate::store::{InMemoryTaskStore, TaskStore};
use crate::types::{OutputMode, Task, TaskEvent, TaskId};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Job scheduling state shared by every clone of the service
#[derive(Clone)]
pub(crate) struct JobState {
    /// Semaphore to limit concurrent jobs (respects max_concurrent_jobs config)
    pub(crate) concurrent_limit: Arc<tokio::sync::Semaphore>,
    /// Map of unfinished tasks to their cancellation tokens
    pub(crate) active_tasks: Arc<tokio::sync::Mutex<HashMap<TaskId, CancellationToken>>>,
    /// Flag to indicate whether new tasks are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
}

/// Main service instance (cloneable - all fields are Arc-wrapped)
///
/// Owns the task store and spawns one job per submitted task. The job is the
/// only writer of its task's state.
#[derive(Clone)]
pub struct DocumentExtractor {
    /// Task store (single source of truth for task state)
    pub(crate) store: Arc<dyn TaskStore>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<TaskEvent>,
    /// Configuration (wrapped in Arc for sharing across jobs)
    pub(crate) config: Arc<Config>,
    /// HTTP fetcher for remote archives
    pub(crate) fetcher: Fetcher,
    /// Converter producing the final artifact (trait object for pluggable implementations)
    pub(crate) converter: Arc<dyn Converter>,
    /// Job scheduling state
    pub(crate) job_state: JobState,
}

impl DocumentExtractor {
    /// Create a new service with the in-memory store and the built-in converter
    pub async fn new(config: Config) -> Result<Self> {
        let converter = Arc::new(BuiltinConverter::new(config.conversion.clone()));
        Self::with_parts(config, Arc::new(InMemoryTaskStore::new()), converter).await
    }

    /// Create a new service with a custom task store and converter
    pub async fn with_parts(
        config: Config,
        store: Arc<dyn TaskStore>,
        converter: Arc<dyn Converter>,
    ) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.storage.scratch_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create scratch directory '{}': {}",
                        config.storage.scratch_dir.display(),
                        e
                    ),
                ))
            })?;

        let fetcher = Fetcher::new(&config.fetch)?;
        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let job_state = JobState {
            concurrent_limit: Arc::new(tokio::sync::Semaphore::new(
                config.runner.max_concurrent_jobs,
            )),
            active_tasks: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
            accepting_new: Arc::new(AtomicBool::new(true)),
        };

        tracing::info!(
            store = store.name(),
            converter = converter.name(),
            scratch_dir = ?config.storage.scratch_dir,
            max_concurrent_jobs = config.runner.max_concurrent_jobs,
            "document extractor ready"
        );

        Ok(Self {
            store,
            event_tx,
            config: Arc::new(config),
            fetcher,
            converter,
            job_state,
        })
    }

    /// Create a task for `url` and start processing it in the background
    ///
    /// The URL is validated before any task exists. Returns the task as
    /// created, in `pending`.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a malformed or non-http(s) URL
    /// - `ShuttingDown` once [`shutdown`](Self::shutdown) has started
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use doc_extractor::*;
    /// # async fn example(extractor: DocumentExtractor) -> Result<()> {
    /// let task = extractor
    ///     .submit("https://example.com/docs.zip", OutputMode::Txt)
    ///     .await?;
    /// println!("queued {}", task.id);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn submit(&self, url: &str, mode: OutputMode) -> Result<Task> {
        if !self.job_state.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let url = validate_url(url)?;

        // The token is registered before the task becomes visible; shutdown
        // flips `accepting_new` before it takes this lock to cancel jobs.
        let token = CancellationToken::new();
        let task = {
            let mut active = self.job_state.active_tasks.lock().await;
            if !self.job_state.accepting_new.load(Ordering::SeqCst) {
                return Err(Error::ShuttingDown);
            }
            let task = self.store.create(mode, url.as_str()).await?;
            active.insert(task.id, token.clone());
            task
        };
        self.emit(TaskEvent::Created { id: task.id, mode });

        tracing::info!(task_id = %task.id, %mode, url = %url, "task created");

        let extractor = self.clone();
        let task_id = task.id;
        tokio::spawn(async move {
            extractor.run_job(task_id, mode, url, token).await;
        });

        Ok(task)
    }

    /// Subscribe to task events
    ///
    /// Every state change made by a job is broadcast. Slow subscribers may
    /// miss events (`RecvError::Lagged`); the store stays authoritative.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<TaskEvent> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Scratch workspace owned by a task
    pub fn workspace_for(&self, id: TaskId) -> PathBuf {
        self.config.storage.scratch_dir.join(id.to_string())
    }

    pub(crate) fn emit(&self, event: TaskEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}
