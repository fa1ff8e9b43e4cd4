//! Inbound event loop.
//!
//! Presence observations are applied inline, in arrival order, so the last
//! observation of an entity always wins. Everything after that (notices,
//! command replies, provisioning) runs on its own task so a slow platform
//! call for one event never holds up the others; those rely on the
//! container lock in provisioning for ordering.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing;

use statuswatch_commands::CommandGateway;
use statuswatch_core::events::PlatformEvent;
use statuswatch_core::traits::platform::Platform;
use statuswatch_core::types::{ChannelId, UserId};
use statuswatch_notify::NotificationDispatcher;
use statuswatch_presence::{PresenceTracker, Transition};
use statuswatch_provision::{ArchivalSweeper, ResourceProvisioner};

/// Consumes platform events and routes them to the components.
#[derive(Debug)]
pub struct EventLoop {
    platform: Arc<dyn Platform>,
    tracker: Arc<PresenceTracker>,
    dispatcher: Arc<NotificationDispatcher>,
    commands: Arc<CommandGateway>,
    provisioner: Option<Arc<ResourceProvisioner>>,
    archiver: Option<Arc<ArchivalSweeper>>,
    /// Post the startup notice on the first ready event
    announce_startup: bool,
    /// The first ready event has been handled
    started: AtomicBool,
}

impl EventLoop {
    /// Create an event loop without provisioning.
    pub fn new(
        platform: Arc<dyn Platform>,
        tracker: Arc<PresenceTracker>,
        dispatcher: Arc<NotificationDispatcher>,
        commands: Arc<CommandGateway>,
        announce_startup: bool,
    ) -> Self {
        Self {
            platform,
            tracker,
            dispatcher,
            commands,
            provisioner: None,
            archiver: None,
            announce_startup,
            started: AtomicBool::new(false),
        }
    }

    /// Enable member-joined provisioning and member-removed archival.
    pub fn with_provisioning(
        mut self,
        provisioner: Arc<ResourceProvisioner>,
        archiver: Arc<ArchivalSweeper>,
    ) -> Self {
        self.provisioner = Some(provisioner);
        self.archiver = Some(archiver);
        self
    }

    /// Consume events until the channel closes or `cancel` fires, then wait
    /// for in-flight handlers.
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::Receiver<PlatformEvent>,
        cancel: CancellationToken,
    ) {
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => {
                    let Some(event) = event else { break };
                    let observed = self.observe_in_order(&event).await;
                    let this = Arc::clone(&self);
                    in_flight.spawn(async move { this.process(event, observed).await });
                }
            }
            while let Some(done) = in_flight.try_join_next() {
                if let Err(e) = done {
                    tracing::error!(error = %e, "Event handler panicked");
                }
            }
        }

        while let Some(done) = in_flight.join_next().await {
            if let Err(e) = done {
                tracing::error!(error = %e, "Event handler panicked");
            }
        }
        tracing::info!("Event loop stopped");
    }

    /// Handle a single event.
    pub async fn handle(&self, event: PlatformEvent) {
        let observed = self.observe_in_order(&event).await;
        self.process(event, observed).await;
    }

    /// Feed presence-bearing events for monitored entities to the tracker.
    async fn observe_in_order(&self, event: &PlatformEvent) -> Option<Transition> {
        let (entity, status) = match *event {
            PlatformEvent::PresenceChanged { entity, status } => (entity, status),
            PlatformEvent::MemberRemoved { member } => (member, None),
            _ => return None,
        };
        if !self.tracker.is_monitored(entity) {
            return None;
        }
        self.tracker.observe(entity, status).await
    }

    async fn process(&self, event: PlatformEvent, observed: Option<Transition>) {
        tracing::trace!(kind = event.kind(), "Handling event");
        if let Some(transition) = observed {
            self.dispatcher.dispatch_logged(&transition).await;
        }
        match event {
            PlatformEvent::Ready => self.on_ready().await,
            PlatformEvent::PresenceChanged { .. } => {}
            PlatformEvent::MessageReceived {
                author,
                channel,
                text,
            } => self.on_message(author, channel, &text).await,
            PlatformEvent::MemberJoined { member } => self.on_member_joined(member).await,
            PlatformEvent::MemberRemoved { member } => self.on_member_removed(member).await,
        }
    }

    async fn on_ready(&self) {
        let first = !self.started.swap(true, Ordering::SeqCst);
        tracing::info!(first, "Platform session ready");

        if first && self.announce_startup {
            if let Err(e) = self.dispatcher.announce_startup(self.tracker.monitored()).await {
                tracing::warn!(error = %e, "Failed to post startup notice");
            }
        }

        for transition in self.tracker.poll(self.platform.as_ref()).await {
            self.dispatcher.dispatch_logged(&transition).await;
        }

        if first {
            if let Some(provisioner) = &self.provisioner {
                if let Err(e) = provisioner.sweep().await {
                    tracing::warn!(error = %e, "Initial provisioning sweep failed");
                }
            }
        }
    }

    async fn on_message(&self, author: UserId, channel: ChannelId, text: &str) {
        let Some(response) = self.commands.handle_message(author, text).await else {
            return;
        };
        if let Err(e) = self
            .platform
            .send_message(channel, &response.into_payload())
            .await
        {
            tracing::warn!(channel = %channel, error = %e, "Failed to post command reply");
        }
    }

    async fn on_member_joined(&self, member: UserId) {
        let Some(provisioner) = &self.provisioner else {
            return;
        };
        match provisioner.ensure_member(member).await {
            Ok(outcome) => {
                tracing::debug!(member = %member, outcome = ?outcome, "Provisioned new member");
            }
            Err(e) => {
                tracing::warn!(member = %member, error = %e, "Provisioning for new member failed");
            }
        }
    }

    async fn on_member_removed(&self, member: UserId) {
        let Some(archiver) = &self.archiver else {
            return;
        };
        match archiver.archive_owned_by(member).await {
            Ok(0) => {}
            Ok(count) => {
                tracing::info!(member = %member, count, "Archived resources of departed member");
            }
            Err(e) => tracing::warn!(
                member = %member,
                error = %e,
                "Failed to archive resources of departed member"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use statuswatch_core::MemoryPlatform;
    use statuswatch_core::config::CommandsConfig;
    use statuswatch_core::types::{Member, RawPresence, ResourceInfo};
    use statuswatch_presence::{StateStore, StatusClass};
    use statuswatch_provision::ArchivePolicy;

    const SERVICE: UserId = UserId::new(1);
    const BOT: UserId = UserId::new(50);
    const STATUS: ChannelId = ChannelId::new(500);
    const ACTIVE: ChannelId = ChannelId::new(900);
    const ARCHIVE: ChannelId = ChannelId::new(901);

    struct Fixture {
        platform: Arc<MemoryPlatform>,
        tracker: Arc<PresenceTracker>,
        event_loop: Arc<EventLoop>,
        _dir: tempfile::TempDir,
    }

    fn member(id: UserId, name: &str, bot: bool) -> Member {
        Member {
            id,
            display_name: name.to_string(),
            is_bot: bot,
            is_admin: false,
            roles: Vec::new(),
        }
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(MemoryPlatform::new(SERVICE));
        platform.add_member(member(BOT, "Worker", true));
        let store = Arc::new(StateStore::new(dir.path().join("state.json")));
        let tracker = Arc::new(PresenceTracker::new(store, vec![BOT]));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            platform.clone(),
            STATUS,
            Vec::new(),
        ));
        let commands = Arc::new(CommandGateway::new(
            platform.clone(),
            Arc::clone(&tracker),
            CommandsConfig::default(),
        ));
        let provisioner = Arc::new(ResourceProvisioner::new(
            platform.clone(),
            ACTIVE,
            Vec::new(),
            None,
            24,
        ));
        let archiver = Arc::new(
            ArchivalSweeper::new(
                platform.clone(),
                ACTIVE,
                ARCHIVE,
                ArchivePolicy {
                    inactivity_threshold_days: 14,
                },
            )
            .with_lock(provisioner.container_lock()),
        );
        let event_loop = Arc::new(
            EventLoop::new(platform.clone(), Arc::clone(&tracker), dispatcher, commands, true)
                .with_provisioning(provisioner, archiver),
        );
        Fixture {
            platform,
            tracker,
            event_loop,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_ready_announces_once_and_records_initial_state() {
        let f = fixture();
        f.platform.set_presence(BOT, Some(RawPresence::Online));

        f.event_loop.handle(PlatformEvent::Ready).await;
        f.event_loop.handle(PlatformEvent::Ready).await;

        let sent = f.platform.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1.embed.as_ref().unwrap().title, "Status Watcher Online");
        assert_eq!(f.tracker.status_of(BOT), Some(StatusClass::Reachable));
    }

    #[tokio::test]
    async fn test_presence_events_notify_on_transition_only() {
        let f = fixture();
        let changed = |status| PlatformEvent::PresenceChanged { entity: BOT, status };

        f.event_loop.handle(changed(Some(RawPresence::Online))).await;
        f.event_loop.handle(changed(Some(RawPresence::Idle))).await;
        assert!(f.platform.sent_messages().is_empty());

        f.event_loop.handle(changed(Some(RawPresence::Offline))).await;
        let sent = f.platform.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, STATUS);

        f.event_loop
            .handle(PlatformEvent::PresenceChanged {
                entity: UserId::new(77),
                status: Some(RawPresence::Offline),
            })
            .await;
        assert_eq!(f.tracker.status_of(UserId::new(77)), None);
    }

    #[tokio::test]
    async fn test_command_reply_is_posted_in_channel() {
        let f = fixture();
        let human = UserId::new(20);
        f.platform.add_member(member(human, "Ada", false));

        f.event_loop
            .handle(PlatformEvent::MessageReceived {
                author: human,
                channel: ChannelId::new(42),
                text: "!status".into(),
            })
            .await;

        let sent = f.platform.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, ChannelId::new(42));
        assert!(sent[0].1.content.as_deref().unwrap().contains("<@50>"));
    }

    #[tokio::test]
    async fn test_membership_events() {
        let f = fixture();
        let human = UserId::new(20);
        f.platform.add_member(member(human, "Ada", false));

        f.event_loop.handle(PlatformEvent::MemberJoined { member: human }).await;
        assert_eq!(f.platform.resources_in(ACTIVE).len(), 1);

        f.platform.add_resource(ResourceInfo {
            id: ChannelId::new(3),
            name: "shared".into(),
            parent: Some(ACTIVE),
            owner: None,
            created_at: Utc::now(),
            last_activity_at: None,
        });
        f.platform.remove_member(human);
        f.event_loop.handle(PlatformEvent::MemberRemoved { member: human }).await;
        assert_eq!(f.platform.resources_in(ARCHIVE).len(), 1);
        assert_eq!(f.platform.resources_in(ACTIVE)[0].name, "shared");
    }

    #[tokio::test]
    async fn test_monitored_member_removal_is_unreachable() {
        let f = fixture();
        f.event_loop
            .handle(PlatformEvent::PresenceChanged {
                entity: BOT,
                status: Some(RawPresence::Online),
            })
            .await;
        f.event_loop.handle(PlatformEvent::MemberRemoved { member: BOT }).await;
        assert_eq!(f.tracker.status_of(BOT), Some(StatusClass::Unreachable));
        assert_eq!(f.platform.sent_messages().len(), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let f = fixture();
        let (tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(&f.event_loop).run(rx, cancel.clone()));

        tx.send(PlatformEvent::PresenceChanged {
            entity: BOT,
            status: Some(RawPresence::Online),
        })
        .await
        .unwrap();
        tokio::task::yield_now().await;
        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_run_applies_presence_updates_in_arrival_order() {
        let changed = |status| PlatformEvent::PresenceChanged { entity: BOT, status };
        for _ in 0..20 {
            let f = fixture();
            f.event_loop.handle(changed(Some(RawPresence::Online))).await;

            let (tx, rx) = mpsc::channel(8);
            let handle = tokio::spawn(Arc::clone(&f.event_loop).run(rx, CancellationToken::new()));
            tx.send(changed(Some(RawPresence::Offline))).await.unwrap();
            tx.send(changed(Some(RawPresence::Online))).await.unwrap();
            drop(tx);
            handle.await.unwrap();

            assert_eq!(f.tracker.status_of(BOT), Some(StatusClass::Reachable));
            assert_eq!(f.platform.sent_messages().len(), 2);
        }
    }
}
