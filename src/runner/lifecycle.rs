//! Shutdown coordination.

use crate::error::Result;
use crate::types::TaskEvent;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::DocumentExtractor;

/// How long shutdown waits for jobs to drain
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl DocumentExtractor {
    /// Gracefully shut down the service
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new tasks (`submit` returns `ShuttingDown`)
    /// 2. Cancels every active job through its cancellation token
    /// 3. Waits up to 30 seconds for the jobs to record their terminal state
    /// 4. Broadcasts [`TaskEvent::Shutdown`]
    ///
    /// Calling it twice is harmless.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        // 1. Stop accepting new tasks
        self.job_state.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new tasks");

        // 2. Cancel active jobs
        self.cancel_all().await;

        // 3. Wait for jobs to drain
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.wait_for_active_tasks()).await {
            Ok(()) => {
                tracing::info!("All active jobs finished");
            }
            Err(_) => {
                let remaining = self.job_state.active_tasks.lock().await.len();
                tracing::warn!(
                    remaining,
                    "Timeout waiting for jobs to finish, proceeding with shutdown"
                );
            }
        }

        // 4. Emit shutdown event
        self.emit(TaskEvent::Shutdown);

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether `submit` currently accepts tasks
    pub fn is_accepting(&self) -> bool {
        self.job_state.accepting_new.load(Ordering::SeqCst)
    }

    async fn cancel_all(&self) {
        let active = self.job_state.active_tasks.lock().await;
        tracing::debug!(active_count = active.len(), "Cancelling all active jobs");

        for (id, token) in active.iter() {
            tracing::debug!(task_id = %id, "Signaling cancellation");
            token.cancel();
        }
    }

    async fn wait_for_active_tasks(&self) {
        loop {
            let active_count = self.job_state.active_tasks.lock().await.len();
            if active_count == 0 {
                return;
            }

            tracing::debug!(active_count, "Waiting for active jobs to finish");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
