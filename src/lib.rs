//! # doc-extractor
//!
//! Asynchronous archive-to-document extraction service.
//!
//! A caller submits the URL of a remote archive (ZIP, TAR, TAR.GZ, 7z or RAR) and
//! an output mode. The service creates a task, returns its identifier
//! immediately, and in the background downloads the archive, unpacks it
//! safely into a task-exclusive scratch workspace, and converts the documents
//! it finds into a single PDF or plain-text artifact. Callers poll the task's
//! status and fetch the artifact once it is `completed`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use doc_extractor::{Config, DocumentExtractor, OutputMode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let extractor = DocumentExtractor::new(Config::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = extractor.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let task = extractor
//!         .submit("https://example.com/docs.zip", OutputMode::Txt)
//!         .await?;
//!     println!("queued {}", task.id);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Document conversion
pub mod conversion;
/// Error types
pub mod error;
/// Archive extraction
pub mod extraction;
/// Remote archive fetching
pub mod fetch;
/// Job runner (the `DocumentExtractor` service)
pub mod runner;
/// Task storage
pub mod store;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use conversion::{BuiltinConverter, ConversionReport, Converter};
pub use error::{
    ApiError, Error, ErrorDetail, PipelineError, Result, TaskError, ToHttpStatus,
};
pub use runner::{Artifact, DocumentExtractor};
pub use store::{InMemoryTaskStore, TaskStore};
pub use types::{ArchiveType, OutputMode, Stage, Task, TaskEvent, TaskId, TaskState, Transition};

/// Helper function to run the service with graceful signal handling.
///
/// Waits for a termination signal and then calls the service's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use doc_extractor::{Config, DocumentExtractor, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let extractor = DocumentExtractor::new(Config::default()).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(extractor).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(extractor: DocumentExtractor) -> Result<()> {
    wait_for_signal().await;
    extractor.shutdown().await
}

/// Serve the REST API until a termination signal arrives.
///
/// The service is shut down either way. If the server stops first (the bind
/// address is taken, the listener fails) its error is returned, so the
/// process does not stay up without an API.
pub async fn serve_with_shutdown(extractor: DocumentExtractor) -> Result<()> {
    serve_until(extractor, wait_for_signal()).await
}

async fn serve_until(
    extractor: DocumentExtractor,
    signal: impl std::future::Future<Output = ()>,
) -> Result<()> {
    let config = extractor.config().clone();
    let mut server = tokio::spawn(api::start_api_server(
        std::sync::Arc::new(extractor.clone()),
        config,
    ));

    let outcome = tokio::select! {
        joined = &mut server => Err(match joined {
            Ok(Ok(())) => Error::ApiServerError("API server stopped unexpectedly".into()),
            Ok(Err(e)) => e,
            Err(e) => Error::ApiServerError(format!("API server task failed: {}", e)),
        }),
        () = signal => Ok(()),
    };

    match &outcome {
        Ok(()) => server.abort(),
        Err(e) => tracing::error!(error = %e, "API server stopped, shutting down"),
    }

    extractor.shutdown().await?;
    outcome
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
