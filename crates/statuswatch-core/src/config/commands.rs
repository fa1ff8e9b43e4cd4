//! Chat command configuration.

use serde::{Deserialize, Serialize};

/// Command prefix, cooldowns, and the restart relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    /// Prefix that marks a message as a command.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Per-user cooldown of `status`, in seconds.
    #[serde(default = "default_status_cooldown")]
    pub status_cooldown_seconds: u64,
    /// Per-user cooldown of `ensure`, in seconds.
    #[serde(default = "default_ensure_cooldown")]
    pub ensure_cooldown_seconds: u64,
    /// Per-user cooldown of `restart`, in seconds.
    #[serde(default = "default_restart_user_cooldown")]
    pub restart_user_cooldown_seconds: u64,
    /// Global cooldown of `restart`, in seconds.
    #[serde(default = "default_restart_global_cooldown")]
    pub restart_global_cooldown_seconds: u64,
    /// Webhook relaying restart requests. Falls back to `notify.webhook_url`.
    #[serde(default)]
    pub restart_webhook_url: Option<String>,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            status_cooldown_seconds: default_status_cooldown(),
            ensure_cooldown_seconds: default_ensure_cooldown(),
            restart_user_cooldown_seconds: default_restart_user_cooldown(),
            restart_global_cooldown_seconds: default_restart_global_cooldown(),
            restart_webhook_url: None,
        }
    }
}

fn default_prefix() -> String {
    "!".to_string()
}

fn default_status_cooldown() -> u64 {
    30
}

fn default_ensure_cooldown() -> u64 {
    60
}

fn default_restart_user_cooldown() -> u64 {
    900
}

fn default_restart_global_cooldown() -> u64 {
    300
}
