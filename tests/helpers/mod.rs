//! Shared wiring for the end-to-end tests: the same graph `main` builds,
//! backed by the in-memory platform.

#![allow(dead_code)]

use std::sync::Arc;

use statuswatch_commands::CommandGateway;
use statuswatch_core::MemoryPlatform;
use statuswatch_core::config::AppConfig;
use statuswatch_core::types::{ChannelId, Member, MessagePayload, UserId};
use statuswatch_notify::NotificationDispatcher;
use statuswatch_presence::{PresenceTracker, StateStore};
use statuswatch_provision::{ArchivalSweeper, ArchivePolicy, ResourceProvisioner};
use statuswatch_worker::EventLoop;

pub const SERVICE: UserId = UserId::new(1);
pub const ADMIN: UserId = UserId::new(2);
pub const WORKER_A: UserId = UserId::new(11);
pub const WORKER_B: UserId = UserId::new(12);
pub const STATUS: ChannelId = ChannelId::new(500);
pub const ACTIVE: ChannelId = ChannelId::new(900);
pub const ARCHIVE: ChannelId = ChannelId::new(901);

pub const CONFIG: &str = r#"
    [platform]
    token = "test-token"
    guild_id = "100"

    [monitor]
    entity_ids = ["11", "12"]
    status_channel_id = "500"

    [notify]
    escalation_ids = ["2"]

    [provisioning]
    enabled = true
    active_category_id = "900"
    archive_category_id = "901"

    [archive]
    inactivity_threshold_days = 14

    [commands]
    prefix = "!"
"#;

/// A fully wired watcher over a [`MemoryPlatform`].
pub struct TestWatcher {
    pub config: AppConfig,
    pub platform: Arc<MemoryPlatform>,
    pub store: Arc<StateStore>,
    pub tracker: Arc<PresenceTracker>,
    pub provisioner: Arc<ResourceProvisioner>,
    pub sweeper: Arc<ArchivalSweeper>,
    pub commands: Arc<CommandGateway>,
    pub event_loop: Arc<EventLoop>,
    pub dir: tempfile::TempDir,
}

impl TestWatcher {
    /// Build a watcher with a fresh state directory.
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(MemoryPlatform::new(SERVICE));
        platform.add_member(Member {
            id: ADMIN,
            display_name: "Admin".into(),
            is_bot: false,
            is_admin: true,
            roles: Vec::new(),
        });
        for (id, name) in [(WORKER_A, "Worker A"), (WORKER_B, "Worker B")] {
            platform.add_member(bot(id, name));
        }
        Self::with_state(platform, dir).await
    }

    /// Build a watcher over an existing platform and state directory.
    pub async fn with_state(platform: Arc<MemoryPlatform>, dir: tempfile::TempDir) -> Self {
        let config = AppConfig::from_toml_str(CONFIG).unwrap();
        config.validate().unwrap();

        let store = Arc::new(StateStore::new(dir.path().join("state.json")));
        let tracker = Arc::new(
            PresenceTracker::restore(Arc::clone(&store), config.monitor.entity_ids.clone()).await,
        );
        let dispatcher = Arc::new(NotificationDispatcher::new(
            platform.clone(),
            config.status_channel_id().unwrap(),
            config.notify.escalation_ids.clone(),
        ));

        let (active, archive) = config.containers().unwrap().unwrap();
        let provisioner = Arc::new(ResourceProvisioner::new(
            platform.clone(),
            active,
            config.provisioning.ignore_roles.clone(),
            config.provisioning.designated_role.clone(),
            config.provisioning.creation_window_hours,
        ));
        let sweeper = Arc::new(
            ArchivalSweeper::new(
                platform.clone(),
                active,
                archive,
                ArchivePolicy {
                    inactivity_threshold_days: config.archive.inactivity_threshold_days,
                },
            )
            .with_lock(provisioner.container_lock()),
        );

        let commands = Arc::new(
            CommandGateway::new(platform.clone(), Arc::clone(&tracker), config.commands.clone())
                .with_provisioner(Arc::clone(&provisioner), archive),
        );
        let event_loop = Arc::new(
            EventLoop::new(
                platform.clone(),
                Arc::clone(&tracker),
                dispatcher,
                Arc::clone(&commands),
                config.notify.announce_startup,
            )
            .with_provisioning(Arc::clone(&provisioner), Arc::clone(&sweeper)),
        );

        Self {
            config,
            platform,
            store,
            tracker,
            provisioner,
            sweeper,
            commands,
            event_loop,
            dir,
        }
    }

    /// Messages posted to the status channel so far.
    pub fn status_posts(&self) -> Vec<MessagePayload> {
        self.platform
            .sent_messages()
            .into_iter()
            .filter(|(channel, _)| *channel == STATUS)
            .map(|(_, payload)| payload)
            .collect()
    }
}

pub fn bot(id: UserId, name: &str) -> Member {
    Member {
        id,
        display_name: name.to_string(),
        is_bot: true,
        is_admin: false,
        roles: Vec::new(),
    }
}

pub fn human(id: UserId, name: &str) -> Member {
    Member {
        id,
        display_name: name.to_string(),
        is_bot: false,
        is_admin: false,
        roles: Vec::new(),
    }
}
