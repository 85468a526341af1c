//! Per-task job execution.
//!
//! A job claims its task, then runs Fetch, Extract and Convert in order,
//! recording a checkpoint in the store before each stage. Stage errors are
//! caught here and become the task's `failed` message; nothing propagates to
//! the caller that submitted the task.

use crate::error::{Error, PipelineError, Result};
use crate::extraction::extract_recursive;
use crate::types::{OutputMode, Stage, Task, TaskEvent, TaskId, TaskState, Transition};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::DocumentExtractor;

/// Message recorded when a task is cancelled
pub(crate) const CANCELLED_MESSAGE: &str = "cancelled";
/// Message recorded on successful completion
pub(crate) const COMPLETED_MESSAGE: &str = "extraction completed successfully";

/// Why a job stopped early
#[derive(Debug)]
enum JobFailure {
    /// A stage returned an error
    Stage(Stage, Error),
    /// The cancellation token fired
    Cancelled,
    /// The store rejected a checkpoint; the job cannot continue
    Store(Error),
}

impl JobFailure {
    fn at(stage: Stage) -> impl FnOnce(Error) -> JobFailure {
        move |e| match e {
            Error::Pipeline(PipelineError::Cancelled) => JobFailure::Cancelled,
            e => JobFailure::Stage(stage, e),
        }
    }

    /// Message stored on the failed task
    fn message(&self) -> String {
        match self {
            JobFailure::Cancelled => CANCELLED_MESSAGE.to_string(),
            JobFailure::Stage(stage, e) => format!("{} failed: {}", stage, failure_reason(e)),
            JobFailure::Store(e) => e.to_string(),
        }
    }
}

/// Short reason for a stage error, without repeating the stage context
fn failure_reason(e: &Error) -> String {
    match e {
        Error::Pipeline(PipelineError::FetchFailed { reason, .. })
        | Error::Pipeline(PipelineError::ExtractionFailed { reason, .. })
        | Error::Pipeline(PipelineError::ConversionFailed { reason }) => reason.clone(),
        other => other.to_string(),
    }
}

impl DocumentExtractor {
    /// Drive one task to a terminal state
    pub(crate) async fn run_job(
        &self,
        task_id: TaskId,
        mode: OutputMode,
        url: Url,
        cancel: CancellationToken,
    ) {
        let workspace = self.workspace_for(task_id);

        match self.execute(task_id, mode, &url, &workspace, &cancel).await {
            Ok(output_path) => {
                if self.config.storage.cleanup_intermediate {
                    remove_intermediates(&workspace).await;
                }
                match self
                    .record(task_id, Transition::completed(COMPLETED_MESSAGE, &output_path))
                    .await
                {
                    Ok(_) => {
                        tracing::info!(task_id = %task_id, ?output_path, "task completed");
                    }
                    Err(e) => {
                        tracing::error!(task_id = %task_id, error = %e, "failed to record completion");
                    }
                }
            }
            Err(JobFailure::Store(e)) => {
                tracing::error!(task_id = %task_id, error = %e, "task store rejected checkpoint, aborting job");
            }
            Err(failure) => {
                let message = failure.message();
                match &failure {
                    JobFailure::Cancelled => {
                        tracing::info!(task_id = %task_id, "task cancelled");
                    }
                    _ => {
                        tracing::warn!(task_id = %task_id, %message, "task failed");
                    }
                }

                if self.config.storage.cleanup_intermediate {
                    if let Err(e) = tokio::fs::remove_dir_all(&workspace).await {
                        if e.kind() != std::io::ErrorKind::NotFound {
                            tracing::warn!(task_id = %task_id, error = %e, "failed to remove workspace");
                        }
                    }
                }

                if let Err(e) = self.record(task_id, Transition::failed(message)).await {
                    tracing::error!(task_id = %task_id, error = %e, "failed to record failure");
                }
            }
        }

        self.job_state.active_tasks.lock().await.remove(&task_id);
    }

    async fn execute(
        &self,
        task_id: TaskId,
        mode: OutputMode,
        url: &Url,
        workspace: &Path,
        cancel: &CancellationToken,
    ) -> std::result::Result<PathBuf, JobFailure> {
        // Queued tasks stay pending until a permit frees up
        let _permit = tokio::select! {
            _ = cancel.cancelled() => return Err(JobFailure::Cancelled),
            permit = self.job_state.concurrent_limit.clone().acquire_owned() => {
                permit.map_err(|e| JobFailure::Store(Error::Other(format!("job limiter closed: {}", e))))?
            }
        };
        check_cancelled(cancel)?;

        // Fetch
        self.checkpoint(task_id, "downloading archive").await?;
        let archive = self
            .fetcher
            .fetch(url, workspace, cancel)
            .await
            .map_err(JobFailure::at(Stage::Fetch))?;
        check_cancelled(cancel)?;

        // Extract
        self.checkpoint(task_id, "extracting archive").await?;
        let extracted_dir = workspace.join("extracted");
        let files = extract_recursive(&archive, &extracted_dir, &self.config.extraction, 0)
            .await
            .map_err(JobFailure::at(Stage::Extract))?;
        check_cancelled(cancel)?;

        tracing::debug!(task_id = %task_id, file_count = files.len(), "archive extracted");

        // Convert
        self.checkpoint(
            task_id,
            format!("converting {} file(s) to {}", files.len(), mode),
        )
        .await?;
        let output_path = workspace.join(format!("output.{}", mode.extension()));
        let report = self
            .converter
            .convert(mode, &extracted_dir, &files, &output_path)
            .await
            .map_err(JobFailure::at(Stage::Convert))?;
        check_cancelled(cancel)?;

        tracing::debug!(
            task_id = %task_id,
            converted = report.converted,
            skipped = report.skipped,
            "conversion finished"
        );

        Ok(report.output_path)
    }

    async fn checkpoint(
        &self,
        task_id: TaskId,
        message: impl Into<String>,
    ) -> std::result::Result<Task, JobFailure> {
        self.record(task_id, Transition::processing(message))
            .await
            .map_err(JobFailure::Store)
    }

    /// Apply a transition and broadcast the matching event
    pub(crate) async fn record(&self, task_id: TaskId, transition: Transition) -> Result<Task> {
        let task = self.store.transition(task_id, transition).await?;

        let event = match task.state {
            TaskState::Processing => TaskEvent::Progress {
                id: task.id,
                message: task.message.clone(),
            },
            TaskState::Completed => TaskEvent::Completed {
                id: task.id,
                output_path: task.output_path.clone().unwrap_or_default(),
            },
            TaskState::Failed => TaskEvent::Failed {
                id: task.id,
                message: task.message.clone(),
            },
            TaskState::Pending => return Ok(task),
        };
        self.emit(event);

        Ok(task)
    }
}

fn check_cancelled(cancel: &CancellationToken) -> std::result::Result<(), JobFailure> {
    if cancel.is_cancelled() {
        Err(JobFailure::Cancelled)
    } else {
        Ok(())
    }
}

/// Remove the fetched archive and the extracted tree, keeping the artifact
async fn remove_intermediates(workspace: &Path) {
    let extracted = workspace.join("extracted");
    if let Err(e) = tokio::fs::remove_dir_all(&extracted).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = ?extracted, error = %e, "failed to remove extracted files");
        }
    }

    let mut entries = match tokio::fs::read_dir(workspace).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(?workspace, error = %e, "failed to list workspace");
            return;
        }
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with("archive") {
            if let Err(e) = tokio::fs::remove_file(entry.path()).await {
                tracing::warn!(path = ?entry.path(), error = %e, "failed to remove archive");
            }
        }
    }
}
