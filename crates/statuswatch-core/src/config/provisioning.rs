//! Per-user resource provisioning and archival configuration.

use serde::{Deserialize, Serialize};

use crate::types::ChannelId;

/// Provisioning of private per-member channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    /// Whether provisioning and archival run at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Container holding live per-member resources. Required when enabled.
    #[serde(default)]
    pub active_category_id: Option<ChannelId>,
    /// Container receiving archived resources. Required when enabled.
    #[serde(default)]
    pub archive_category_id: Option<ChannelId>,
    /// Interval between full provisioning sweeps, in hours.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_hours: u64,
    /// Members holding any of these roles (by name) are never provisioned.
    #[serde(default)]
    pub ignore_roles: Vec<String>,
    /// Role (by name) granted to every provisioned member.
    #[serde(default)]
    pub designated_role: Option<String>,
    /// Window of the rolling creation count, in hours.
    #[serde(default = "default_creation_window")]
    pub creation_window_hours: u64,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            active_category_id: None,
            archive_category_id: None,
            sweep_interval_hours: default_sweep_interval(),
            ignore_roles: Vec::new(),
            designated_role: None,
            creation_window_hours: default_creation_window(),
        }
    }
}

/// Inactivity-based archival.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Days without content activity before a resource is archived.
    #[serde(default = "default_threshold_days")]
    pub inactivity_threshold_days: u32,
    /// Interval between archival sweeps, in hours.
    #[serde(default = "default_archive_interval")]
    pub sweep_interval_hours: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            inactivity_threshold_days: default_threshold_days(),
            sweep_interval_hours: default_archive_interval(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_sweep_interval() -> u64 {
    6
}

fn default_creation_window() -> u64 {
    24
}

fn default_threshold_days() -> u32 {
    14
}

fn default_archive_interval() -> u64 {
    24
}
