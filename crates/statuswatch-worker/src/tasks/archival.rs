//! Archival sweep of inactive resources.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use statuswatch_provision::ArchivalSweeper;

use crate::task::{ScheduledTask, TaskError};

/// Periodic archival sweep.
#[derive(Debug)]
pub struct ArchivalSweepTask {
    sweeper: Arc<ArchivalSweeper>,
    period: Duration,
}

impl ArchivalSweepTask {
    /// Create a new archival task
    pub fn new(sweeper: Arc<ArchivalSweeper>, period: Duration) -> Self {
        Self { sweeper, period }
    }
}

#[async_trait]
impl ScheduledTask for ArchivalSweepTask {
    fn name(&self) -> &'static str {
        "archival_sweep"
    }

    fn period(&self) -> Duration {
        self.period
    }

    async fn run(&self) -> Result<(), TaskError> {
        self.sweeper
            .sweep()
            .await
            .map(|_| ())
            .map_err(TaskError::from_app)
    }
}
