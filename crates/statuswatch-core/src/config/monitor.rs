//! Presence monitoring configuration.

use serde::{Deserialize, Serialize};

use crate::types::{ChannelId, UserId};

/// Which entities to watch and where to report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Accounts whose reachability is tracked.
    #[serde(default)]
    pub entity_ids: Vec<UserId>,
    /// Interval between presence polls, in seconds.
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,
    /// Channel receiving transition notices. Required.
    #[serde(default)]
    pub status_channel_id: Option<ChannelId>,
    /// Path of the persisted last-known-status file.
    #[serde(default = "default_state_file")]
    pub state_file: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            entity_ids: Vec::new(),
            check_interval_seconds: default_check_interval(),
            status_channel_id: None,
            state_file: default_state_file(),
        }
    }
}

fn default_check_interval() -> u64 {
    30
}

fn default_state_file() -> String {
    "data/status_state.json".to_string()
}
