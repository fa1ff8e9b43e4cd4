//! Provisioning sweep over every workspace member.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use statuswatch_provision::ResourceProvisioner;

use crate::task::{ScheduledTask, TaskError};

/// Periodic provisioning sweep.
#[derive(Debug)]
pub struct ProvisioningSweepTask {
    provisioner: Arc<ResourceProvisioner>,
    period: Duration,
}

impl ProvisioningSweepTask {
    /// Create a new sweep task
    pub fn new(provisioner: Arc<ResourceProvisioner>, period: Duration) -> Self {
        Self {
            provisioner,
            period,
        }
    }
}

#[async_trait]
impl ScheduledTask for ProvisioningSweepTask {
    fn name(&self) -> &'static str {
        "provisioning_sweep"
    }

    fn period(&self) -> Duration {
        self.period
    }

    async fn run(&self) -> Result<(), TaskError> {
        self.provisioner
            .sweep()
            .await
            .map(|_| ())
            .map_err(TaskError::from_app)
    }
}
