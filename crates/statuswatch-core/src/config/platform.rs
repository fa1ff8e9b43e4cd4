//! Platform connection configuration.

use serde::{Deserialize, Serialize};

use crate::types::GuildId;

/// Connection settings for the collaboration platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Bot token. Required.
    #[serde(default)]
    pub token: String,
    /// Workspace to watch. Required.
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    /// REST API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Gateway websocket URL.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    /// Upper bound on any single platform request, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Delay before reconnecting a dropped gateway session, in seconds.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_seconds: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            guild_id: None,
            api_base: default_api_base(),
            gateway_url: default_gateway_url(),
            request_timeout_seconds: default_request_timeout(),
            reconnect_delay_seconds: default_reconnect_delay(),
        }
    }
}

fn default_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_gateway_url() -> String {
    "wss://gateway.discord.gg/?v=10&encoding=json".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_reconnect_delay() -> u64 {
    5
}
