//! Notification delivery configuration.

use serde::{Deserialize, Serialize};

use crate::types::{ChannelId, UserId};

/// Who gets told about transitions, and how.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Administrators pinged when an entity becomes unreachable.
    #[serde(default)]
    pub escalation_ids: Vec<UserId>,
    /// Channel mirroring delivery failures.
    #[serde(default)]
    pub log_channel_id: Option<ChannelId>,
    /// Webhook receiving a one-line copy of every transition.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Post a notice to the status channel when the watcher comes online.
    #[serde(default = "default_true")]
    pub announce_startup: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            escalation_ids: Vec::new(),
            log_channel_id: None,
            webhook_url: None,
            announce_startup: true,
        }
    }
}

fn default_true() -> bool {
    true
}
