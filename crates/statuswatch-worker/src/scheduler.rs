//! Fixed-interval scheduler for periodic tasks.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use statuswatch_core::error::AppError;

use crate::task::{ScheduledTask, run_logged};

/// Runs registered tasks on their periods.
pub struct TaskScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Names of registered tasks
    registered: Vec<&'static str>,
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("registered", &self.registered)
            .finish()
    }
}

impl TaskScheduler {
    /// Create a new scheduler
    pub async fn new() -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler,
            registered: Vec::new(),
        })
    }

    /// Register a task to run every `task.period()`.
    pub async fn register(&mut self, task: Arc<dyn ScheduledTask>) -> Result<(), AppError> {
        let name = task.name();
        let period = task.period();
        if period.is_zero() {
            return Err(AppError::configuration(format!(
                "Task {name} has a zero period"
            )));
        }

        let job = CronJob::new_repeated_async(period, move |_uuid, _lock| {
            let task = Arc::clone(&task);
            Box::pin(async move {
                run_logged(task.as_ref()).await;
            })
        })
        .map_err(|e| AppError::internal(format!("Failed to create {name} schedule: {}", e)))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add {name} schedule: {}", e)))?;

        self.registered.push(name);
        tracing::info!(
            task = name,
            period_secs = period.as_secs(),
            "Registered scheduled task"
        );
        Ok(())
    }

    /// Names of registered tasks, in registration order.
    pub fn registered(&self) -> &[&'static str] {
        &self.registered
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {}", e)))?;

        tracing::info!(tasks = self.registered.len(), "Task scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&self) -> Result<(), AppError> {
        let mut scheduler = self.scheduler.clone();
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {}", e)))?;

        tracing::info!("Task scheduler shut down");
        Ok(())
    }
}
