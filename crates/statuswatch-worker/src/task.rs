//! Periodic task abstraction.

use std::time::Duration;

use async_trait::async_trait;
use tracing;

use statuswatch_core::error::AppError;

/// A unit of work run on a fixed period.
#[async_trait]
pub trait ScheduledTask: Send + Sync + std::fmt::Debug {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Interval between runs.
    fn period(&self) -> Duration;

    /// Run once.
    async fn run(&self) -> Result<(), TaskError>;
}

/// Error from a task run.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The next run may succeed
    #[error("Transient task failure: {0}")]
    Transient(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

impl TaskError {
    /// Classify an error by whether retrying later can help.
    pub fn from_app(err: AppError) -> Self {
        if err.is_transient() {
            Self::Transient(err.to_string())
        } else {
            Self::Internal(err)
        }
    }
}

/// Run a task once and log the outcome. Failures are never retried here;
/// the next scheduled run is the retry.
pub async fn run_logged(task: &dyn ScheduledTask) {
    let started = tokio::time::Instant::now();
    match task.run().await {
        Ok(()) => {
            tracing::debug!(
                task = task.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Task completed"
            );
        }
        Err(TaskError::Transient(msg)) => {
            tracing::warn!(
                task = task.name(),
                error = %msg,
                "Task failed, will run again next period"
            );
        }
        Err(e) => {
            tracing::error!(task = task.name(), error = %e, "Task failed");
        }
    }
}
