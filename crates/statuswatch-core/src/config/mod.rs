//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! TOML files and `STATUSWATCH__`-prefixed environment variables. Each
//! sub-module represents a logical configuration section. Every section has
//! defaults; values without a sensible default are optional in the schema
//! and enforced by [`AppConfig::validate`].

pub mod commands;
pub mod logging;
pub mod monitor;
pub mod notify;
pub mod platform;
pub mod provisioning;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use self::commands::CommandsConfig;
pub use self::logging::LoggingConfig;
pub use self::monitor::MonitorConfig;
pub use self::notify::NotifyConfig;
pub use self::platform::PlatformConfig;
pub use self::provisioning::{ArchiveConfig, ProvisioningConfig};

use crate::error::AppError;
use crate::types::{ChannelId, GuildId};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "STATUSWATCH";

/// Keys whose environment values are comma-separated lists.
const LIST_KEYS: [&str; 3] = [
    "monitor.entity_ids",
    "notify.escalation_ids",
    "provisioning.ignore_roles",
];

/// Upper bound for any interval or window given in hours (ten years).
pub const MAX_HOURS: u64 = 24 * 366 * 10;

/// Upper bound for the poll interval, in seconds.
pub const MAX_CHECK_INTERVAL_SECONDS: u64 = MAX_HOURS * 3600;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Platform connection settings.
    #[serde(default)]
    pub platform: PlatformConfig,
    /// Monitored entities and the status channel.
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Notification recipients and mirrors.
    #[serde(default)]
    pub notify: NotifyConfig,
    /// Per-member resource provisioning.
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
    /// Inactivity archival.
    #[serde(default)]
    pub archive: ArchiveConfig,
    /// Chat commands and cooldowns.
    #[serde(default)]
    pub commands: CommandsConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// Merges `config/default.toml`, the environment overlay
    /// `config/{env}.toml`, an optional explicit file, and environment
    /// variables prefixed with `STATUSWATCH__` (later sources win).
    pub fn load(env: &str, explicit: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let mut environment = config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .list_separator(",")
            .try_parsing(true);
        for key in LIST_KEYS {
            environment = environment.with_list_parse_key(key);
        }

        let config = builder
            .add_source(environment)
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(toml: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Check that every required value is present.
    ///
    /// Collects all problems into one `Configuration` error so a misconfigured
    /// deployment is fixed in one pass.
    pub fn validate(&self) -> Result<(), AppError> {
        let mut missing = Vec::new();

        if self.platform.token.trim().is_empty() {
            missing.push("platform.token");
        }
        if self.platform.guild_id.is_none() {
            missing.push("platform.guild_id");
        }
        if self.monitor.status_channel_id.is_none() {
            missing.push("monitor.status_channel_id");
        }
        if !(1..=MAX_CHECK_INTERVAL_SECONDS).contains(&self.monitor.check_interval_seconds) {
            missing.push("monitor.check_interval_seconds (must be in 1..=316224000)");
        }
        if self.provisioning.enabled {
            if self.provisioning.active_category_id.is_none() {
                missing.push("provisioning.active_category_id");
            }
            if self.provisioning.archive_category_id.is_none() {
                missing.push("provisioning.archive_category_id");
            }
            if !(1..=MAX_HOURS).contains(&self.provisioning.sweep_interval_hours) {
                missing.push("provisioning.sweep_interval_hours (must be in 1..=87840)");
            }
            if self.provisioning.creation_window_hours > MAX_HOURS {
                missing.push("provisioning.creation_window_hours (must be <= 87840)");
            }
            if !(1..=MAX_HOURS).contains(&self.archive.sweep_interval_hours) {
                missing.push("archive.sweep_interval_hours (must be in 1..=87840)");
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::configuration(format!(
                "Missing or invalid configuration: {}",
                missing.join(", ")
            )))
        }
    }

    /// The watched workspace.
    pub fn guild_id(&self) -> Result<GuildId, AppError> {
        self.platform
            .guild_id
            .ok_or_else(|| AppError::configuration("platform.guild_id is not set"))
    }

    /// The channel receiving transition notices.
    pub fn status_channel_id(&self) -> Result<ChannelId, AppError> {
        self.monitor
            .status_channel_id
            .ok_or_else(|| AppError::configuration("monitor.status_channel_id is not set"))
    }

    /// Active and archive containers, when provisioning is enabled.
    pub fn containers(&self) -> Result<Option<(ChannelId, ChannelId)>, AppError> {
        if !self.provisioning.enabled {
            return Ok(None);
        }
        let active = self.provisioning.active_category_id.ok_or_else(|| {
            AppError::configuration("provisioning.active_category_id is not set")
        })?;
        let archive = self.provisioning.archive_category_id.ok_or_else(|| {
            AppError::configuration("provisioning.archive_category_id is not set")
        })?;
        Ok(Some((active, archive)))
    }

    /// Webhook used to relay restart requests.
    pub fn restart_webhook_url(&self) -> Option<&str> {
        self.commands
            .restart_webhook_url
            .as_deref()
            .or(self.notify.webhook_url.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::UserId;

    const FULL: &str = r#"
        [platform]
        token = "abc"
        guild_id = "100"

        [monitor]
        entity_ids = ["11", 12]
        status_channel_id = 200

        [provisioning]
        active_category_id = "300"
        archive_category_id = "301"
        ignore_roles = ["Staff"]
    "#;

    #[test]
    fn test_defaults_apply() {
        let config = AppConfig::from_toml_str(FULL).unwrap();
        assert_eq!(config.monitor.check_interval_seconds, 30);
        assert_eq!(config.archive.inactivity_threshold_days, 14);
        assert_eq!(config.commands.prefix, "!");
        assert_eq!(config.logging.level, "info");
        assert_eq!(
            config.monitor.entity_ids,
            vec![UserId::new(11), UserId::new(12)]
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_required_values_are_reported_together() {
        let err = AppConfig::from_toml_str("[monitor]\ncheck_interval_seconds = 5")
            .unwrap()
            .validate()
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert!(err.message.contains("platform.token"));
        assert!(err.message.contains("platform.guild_id"));
        assert!(err.message.contains("provisioning.active_category_id"));
    }

    #[test]
    fn test_provisioning_disabled_needs_no_containers() {
        let toml = r#"
            [platform]
            token = "abc"
            guild_id = 1
            [monitor]
            status_channel_id = 2
            [provisioning]
            enabled = false
        "#;
        let config = AppConfig::from_toml_str(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.containers().unwrap(), None);
    }

    #[test]
    fn test_restart_webhook_falls_back_to_notify_webhook() {
        let mut config = AppConfig::default();
        config.notify.webhook_url = Some("https://hooks.example/notify".into());
        assert_eq!(
            config.restart_webhook_url(),
            Some("https://hooks.example/notify")
        );
        config.commands.restart_webhook_url = Some("https://hooks.example/restart".into());
        assert_eq!(
            config.restart_webhook_url(),
            Some("https://hooks.example/restart")
        );
    }

    #[test]
    fn test_out_of_range_intervals_are_rejected() {
        let toml = r#"
            [platform]
            token = "abc"
            guild_id = 1
            [monitor]
            status_channel_id = 2
            check_interval_seconds = 9223372036854775807
            [provisioning]
            enabled = true
            active_category_id = 3
            archive_category_id = 4
            sweep_interval_hours = 9223372036854775807
            creation_window_hours = 9223372036854775807
            [archive]
            sweep_interval_hours = 0
        "#;
        let err = AppConfig::from_toml_str(toml).unwrap().validate().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert!(err.message.contains("monitor.check_interval_seconds"));
        assert!(err.message.contains("provisioning.sweep_interval_hours"));
        assert!(err.message.contains("provisioning.creation_window_hours"));
        assert!(err.message.contains("archive.sweep_interval_hours"));
    }
}
