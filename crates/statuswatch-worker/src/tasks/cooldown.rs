//! Drops expired command cooldowns.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing;

use statuswatch_commands::CommandGateway;

use crate::task::{ScheduledTask, TaskError};

/// Prunes the gateway's cooldown registry every minute.
#[derive(Debug)]
pub struct CooldownPruneTask {
    gateway: Arc<CommandGateway>,
}

impl CooldownPruneTask {
    /// Create a new prune task
    pub fn new(gateway: Arc<CommandGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ScheduledTask for CooldownPruneTask {
    fn name(&self) -> &'static str {
        "cooldown_prune"
    }

    fn period(&self) -> Duration {
        Duration::from_secs(60)
    }

    async fn run(&self) -> Result<(), TaskError> {
        let removed = self.gateway.cooldowns().prune();
        if removed > 0 {
            tracing::trace!(removed, "Pruned expired cooldowns");
        }
        Ok(())
    }
}
