//! Presence poll: queries every monitored entity and feeds the same
//! observation path as push events.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use statuswatch_core::traits::platform::Platform;
use statuswatch_notify::NotificationDispatcher;
use statuswatch_presence::PresenceTracker;

use crate::task::{ScheduledTask, TaskError};

/// Periodic presence poll.
#[derive(Debug)]
pub struct PresencePollTask {
    platform: Arc<dyn Platform>,
    tracker: Arc<PresenceTracker>,
    dispatcher: Arc<NotificationDispatcher>,
    period: Duration,
}

impl PresencePollTask {
    /// Create a new poll task
    pub fn new(
        platform: Arc<dyn Platform>,
        tracker: Arc<PresenceTracker>,
        dispatcher: Arc<NotificationDispatcher>,
        period: Duration,
    ) -> Self {
        Self {
            platform,
            tracker,
            dispatcher,
            period,
        }
    }
}

#[async_trait]
impl ScheduledTask for PresencePollTask {
    fn name(&self) -> &'static str {
        "presence_poll"
    }

    fn period(&self) -> Duration {
        self.period
    }

    async fn run(&self) -> Result<(), TaskError> {
        for transition in self.tracker.poll(self.platform.as_ref()).await {
            self.dispatcher.dispatch_logged(&transition).await;
        }
        Ok(())
    }
}
