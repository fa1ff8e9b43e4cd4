//! Inactivity-based archival of per-member resources.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing;

use statuswatch_core::result::AppResult;
use statuswatch_core::traits::platform::Platform;
use statuswatch_core::types::{ChannelId, ResourceInfo, UserId};

/// When a resource counts as inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchivePolicy {
    /// Inactivity threshold in days
    pub inactivity_threshold_days: u32,
}

impl ArchivePolicy {
    /// Threshold as a duration.
    pub fn threshold(&self) -> Duration {
        Duration::days(i64::from(self.inactivity_threshold_days))
    }

    /// Whether a resource last active at `last_activity` is due at `now`.
    pub fn is_due(&self, last_activity: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - last_activity >= self.threshold()
    }
}

/// Totals of one archival sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    /// Resources moved to the archive container
    pub archived: usize,
    /// Resources still within the threshold
    pub kept: usize,
    /// Resources whose move failed
    pub failed: usize,
}

/// Moves inactive resources from the active to the archive container.
///
/// Each sweep re-lists the active container, so resources archived by an
/// earlier run are never considered again. A move that fails is logged and
/// the sweep continues with the next resource.
#[derive(Debug)]
pub struct ArchivalSweeper {
    platform: Arc<dyn Platform>,
    active: ChannelId,
    archive: ChannelId,
    policy: ArchivePolicy,
    /// Shared with the provisioner when both run
    container_lock: Arc<Mutex<()>>,
}

impl ArchivalSweeper {
    /// Create a sweeper with its own container lock.
    pub fn new(
        platform: Arc<dyn Platform>,
        active: ChannelId,
        archive: ChannelId,
        policy: ArchivePolicy,
    ) -> Self {
        Self {
            platform,
            active,
            archive,
            policy,
            container_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Serialize with another user of the active container.
    pub fn with_lock(mut self, lock: Arc<Mutex<()>>) -> Self {
        self.container_lock = lock;
        self
    }

    /// Archive every active resource inactive for at least the threshold.
    pub async fn sweep(&self) -> AppResult<ArchiveReport> {
        self.sweep_at(Utc::now()).await
    }

    /// [`Self::sweep`] evaluated against a fixed clock.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> AppResult<ArchiveReport> {
        let _guard = self.container_lock.lock().await;
        let resources = self.platform.resources(self.active).await?;
        let mut report = ArchiveReport::default();

        for resource in &resources {
            if !self.policy.is_due(resource.last_activity(), now) {
                report.kept += 1;
                continue;
            }
            if self.archive_one(resource).await {
                report.archived += 1;
            } else {
                report.failed += 1;
            }
        }

        tracing::info!(
            archived = report.archived,
            kept = report.kept,
            failed = report.failed,
            threshold_days = self.policy.inactivity_threshold_days,
            "Archival sweep complete"
        );
        Ok(report)
    }

    /// Archive every active resource owned by `member`, regardless of age.
    ///
    /// Used when a member leaves the workspace.
    pub async fn archive_owned_by(&self, member: UserId) -> AppResult<usize> {
        let _guard = self.container_lock.lock().await;
        let resources = self.platform.resources(self.active).await?;
        let mut archived = 0;
        for resource in resources.iter().filter(|r| r.owner == Some(member)) {
            if self.archive_one(resource).await {
                archived += 1;
            }
        }
        Ok(archived)
    }

    async fn archive_one(&self, resource: &ResourceInfo) -> bool {
        match self.platform.move_resource(resource.id, self.archive).await {
            Ok(()) => {
                tracing::info!(
                    resource = %resource.id,
                    name = %resource.name,
                    last_activity = %resource.last_activity(),
                    "Archived resource"
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    resource = %resource.id,
                    name = %resource.name,
                    error = %e,
                    "Failed to archive resource"
                );
                false
            }
        }
    }
}
