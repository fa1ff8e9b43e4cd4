//! Command gateway: authorization, cooldowns, and routing to handlers.
//!
//! Cooldowns are checked and started in one critical section before a
//! handler runs. The restart relay reserves both its global and per-user
//! windows up front and releases them if the relay fails, so a failed relay
//! can be retried immediately.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing;

use statuswatch_core::config::CommandsConfig;
use statuswatch_core::traits::platform::Platform;
use statuswatch_core::types::{ChannelId, UserId};
use statuswatch_notify::{WebhookClient, WebhookPayload};
use statuswatch_presence::{PresenceTracker, StatusClass};
use statuswatch_provision::{ProvisionOutcome, ResourceProvisioner, SkipReason};

use crate::command::{self, Command};
use crate::cooldown::{CooldownKey, CooldownRegistry};
use crate::response::{CommandRejection, Response};

type HandlerResult = Result<String, CommandRejection>;

/// Routes parsed commands to their handlers.
#[derive(Debug)]
pub struct CommandGateway {
    platform: Arc<dyn Platform>,
    tracker: Arc<PresenceTracker>,
    /// Provisioner and archive container, when provisioning is enabled
    provisioning: Option<(Arc<ResourceProvisioner>, ChannelId)>,
    /// Webhook receiving restart requests
    restart_relay: Option<WebhookClient>,
    cooldowns: CooldownRegistry,
    config: CommandsConfig,
}

impl CommandGateway {
    /// Create a gateway answering status queries only.
    pub fn new(
        platform: Arc<dyn Platform>,
        tracker: Arc<PresenceTracker>,
        config: CommandsConfig,
    ) -> Self {
        Self {
            platform,
            tracker,
            provisioning: None,
            restart_relay: None,
            cooldowns: CooldownRegistry::new(),
            config,
        }
    }

    /// Enable `ensure` and the provisioning part of `summary`.
    pub fn with_provisioner(
        mut self,
        provisioner: Arc<ResourceProvisioner>,
        archive: ChannelId,
    ) -> Self {
        self.provisioning = Some((provisioner, archive));
        self
    }

    /// Enable `restart`.
    pub fn with_restart_relay(mut self, relay: WebhookClient) -> Self {
        self.restart_relay = Some(relay);
        self
    }

    /// Active cooldowns.
    pub fn cooldowns(&self) -> &CooldownRegistry {
        &self.cooldowns
    }

    /// Parse and run a chat message. `None` when it is not a command for us.
    pub async fn handle_message(&self, author: UserId, text: &str) -> Option<Response> {
        if author == self.platform.self_id() {
            return None;
        }
        let parsed = command::parse(&self.config.prefix, text)?;
        Some(self.handle(parsed.command, author, &parsed.args).await)
    }

    /// Run a command on behalf of `invoker`.
    pub async fn handle(&self, command: Command, invoker: UserId, args: &[String]) -> Response {
        let result = match command {
            Command::QueryStatus => self.query_status(invoker),
            Command::Summary => self.summary(invoker).await,
            Command::EnsureResource => self.ensure_resource(invoker).await,
            Command::RequestRestart => self.request_restart(invoker, args).await,
        };

        match result {
            Ok(text) => {
                tracing::info!(command = %command, invoker = %invoker, "Command handled");
                Response::Ok(text)
            }
            Err(rejection @ CommandRejection::Failed { .. }) => {
                tracing::warn!(
                    command = %command,
                    invoker = %invoker,
                    error = %rejection,
                    "Command failed"
                );
                rejection.into()
            }
            Err(rejection) => {
                tracing::debug!(
                    command = %command,
                    invoker = %invoker,
                    reason = %rejection,
                    "Command rejected"
                );
                rejection.into()
            }
        }
    }

    fn query_status(&self, invoker: UserId) -> HandlerResult {
        self.start_cooldown(
            Command::QueryStatus,
            &[(
                CooldownKey::User(Command::QueryStatus, invoker),
                secs(self.config.status_cooldown_seconds),
            )],
        )?;

        let statuses = self.tracker.monitored_statuses();
        if statuses.is_empty() {
            return Ok("No bots are configured for monitoring.".to_string());
        }
        let lines = statuses
            .iter()
            .map(|(id, class)| status_line(*id, *class))
            .collect::<Vec<_>>();
        Ok(format!("**Bot status**\n{}", lines.join("\n")))
    }

    async fn summary(&self, invoker: UserId) -> HandlerResult {
        self.require_admin(Command::Summary, invoker).await?;

        let mut text = String::from("**Status summary**\n");
        for (id, class) in self.tracker.monitored_statuses() {
            text.push_str(&status_line(id, class));
            text.push('\n');
        }

        if let Some((provisioner, archive)) = &self.provisioning {
            let failed = |source| CommandRejection::Failed {
                command: Command::Summary,
                source,
            };
            let active = self
                .platform
                .resources(provisioner.active_container())
                .await
                .map_err(failed)?
                .len();
            let archived = self.platform.resources(*archive).await.map_err(failed)?.len();
            let recent = provisioner.creations().count_recent(Utc::now());
            let window = provisioner.creations().window().num_hours();
            text.push_str(&format!(
                "Active resources: {active}\nArchived resources: {archived}\n\
                 Created in the last {window}h: {recent}"
            ));
        }
        Ok(text.trim_end().to_string())
    }

    async fn ensure_resource(&self, invoker: UserId) -> HandlerResult {
        let Some((provisioner, _)) = &self.provisioning else {
            return Err(CommandRejection::Unavailable(
                Command::EnsureResource,
                "provisioning is disabled",
            ));
        };
        self.start_cooldown(
            Command::EnsureResource,
            &[(
                CooldownKey::User(Command::EnsureResource, invoker),
                secs(self.config.ensure_cooldown_seconds),
            )],
        )?;

        let failed = |source| CommandRejection::Failed {
            command: Command::EnsureResource,
            source,
        };

        if self.is_admin(invoker).await.map_err(failed)? {
            let report = provisioner.sweep().await.map_err(failed)?;
            return Ok(format!(
                "✅ Provisioning sweep complete: {} created, {} skipped, {} failed.",
                report.created, report.skipped, report.failed
            ));
        }

        let text = match provisioner.ensure_member(invoker).await.map_err(failed)? {
            ProvisionOutcome::Created { resource, .. } => {
                format!("✅ Created your private channel <#{resource}>.")
            }
            ProvisionOutcome::Skipped(SkipReason::AlreadyOwned) => {
                "You already have a private channel.".to_string()
            }
            ProvisionOutcome::Skipped(SkipReason::NameTaken(name)) => {
                format!("A channel named `{name}` already exists.")
            }
            ProvisionOutcome::Skipped(_) => {
                "You are not eligible for a private channel.".to_string()
            }
        };
        Ok(text)
    }

    async fn request_restart(&self, invoker: UserId, args: &[String]) -> HandlerResult {
        let Some(relay) = &self.restart_relay else {
            return Err(CommandRejection::Unavailable(
                Command::RequestRestart,
                "no restart webhook is configured",
            ));
        };

        let global = CooldownKey::Global(Command::RequestRestart);
        let user = CooldownKey::User(Command::RequestRestart, invoker);
        let global_window = secs(self.config.restart_global_cooldown_seconds);
        self.start_cooldown(
            Command::RequestRestart,
            &[
                (global, global_window),
                (user, secs(self.config.restart_user_cooldown_seconds)),
            ],
        )?;

        let mut content = format!("🔄 Restart requested by {}", invoker.mention());
        if !args.is_empty() {
            content.push_str(&format!(": {}", args.join(" ")));
        }

        if let Err(source) = relay.post(&WebhookPayload::new(content)).await {
            self.cooldowns.release(global);
            self.cooldowns.release(user);
            return Err(CommandRejection::Failed {
                command: Command::RequestRestart,
                source,
            });
        }

        Ok(format!(
            "🔄 Restart request sent. The next restart can be requested in {}s.",
            global_window.as_secs()
        ))
    }

    fn start_cooldown(
        &self,
        command: Command,
        windows: &[(CooldownKey, Duration)],
    ) -> Result<(), CommandRejection> {
        self.cooldowns
            .try_start(windows)
            .map_err(|(key, remaining)| CommandRejection::CooldownActive {
                command,
                remaining,
                global: matches!(key, CooldownKey::Global(_)),
            })
    }

    async fn require_admin(
        &self,
        command: Command,
        invoker: UserId,
    ) -> Result<(), CommandRejection> {
        match self.is_admin(invoker).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(CommandRejection::Unauthorized(command)),
            Err(source) => Err(CommandRejection::Failed { command, source }),
        }
    }

    async fn is_admin(&self, invoker: UserId) -> statuswatch_core::AppResult<bool> {
        Ok(self
            .platform
            .member(invoker)
            .await?
            .is_some_and(|m| m.is_admin))
    }
}

fn secs(seconds: u64) -> Duration {
    Duration::from_secs(seconds)
}

fn status_line(entity: UserId, class: Option<StatusClass>) -> String {
    let (emoji, label) = match class {
        Some(StatusClass::Reachable) => ("🟢", "reachable"),
        Some(StatusClass::Unreachable) => ("🔴", "unreachable"),
        None => ("⚪", "unknown"),
    };
    format!("{emoji} {}: {label}", entity.mention())
}

#[cfg(test)]
mod tests {
    use super::*;
    use statuswatch_core::MemoryPlatform;
    use statuswatch_core::types::{Member, RawPresence, ResourceInfo};
    use statuswatch_presence::StateStore;

    const SERVICE: UserId = UserId::new(1);
    const BOT: UserId = UserId::new(50);
    const ADMIN: UserId = UserId::new(10);
    const USER: UserId = UserId::new(20);
    const OTHER: UserId = UserId::new(21);
    const ACTIVE: ChannelId = ChannelId::new(900);
    const ARCHIVE: ChannelId = ChannelId::new(901);

    struct Fixture {
        platform: Arc<MemoryPlatform>,
        tracker: Arc<PresenceTracker>,
        _dir: tempfile::TempDir,
    }

    fn member(id: UserId, name: &str, admin: bool) -> Member {
        Member {
            id,
            display_name: name.to_string(),
            is_bot: false,
            is_admin: admin,
            roles: Vec::new(),
        }
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(StateStore::new(dir.path().join("state.json")));
        let platform = Arc::new(MemoryPlatform::new(SERVICE));
        platform.add_member(member(ADMIN, "Admin", true));
        platform.add_member(member(USER, "Ada", false));
        platform.add_member(member(OTHER, "Grace", false));
        Fixture {
            platform,
            tracker: Arc::new(PresenceTracker::new(store, vec![BOT])),
            _dir: dir,
        }
    }

    fn gateway(f: &Fixture) -> CommandGateway {
        let provisioner = Arc::new(ResourceProvisioner::new(
            f.platform.clone(),
            ACTIVE,
            Vec::new(),
            None,
            24,
        ));
        CommandGateway::new(f.platform.clone(), Arc::clone(&f.tracker), CommandsConfig::default())
            .with_provisioner(provisioner, ARCHIVE)
    }

    fn closed_port_relay() -> WebhookClient {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        WebhookClient::new(format!("http://{addr}/restart"), Duration::from_secs(2)).unwrap()
    }

    async fn accepting_relay() -> WebhookClient {
        use axum::Router;
        use axum::http::StatusCode;
        use axum::routing::post;

        let app = Router::new().route("/restart", post(|| async { StatusCode::NO_CONTENT }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        WebhookClient::new(format!("http://{addr}/restart"), Duration::from_secs(5)).unwrap()
    }

    fn remaining_of(response: &Response) -> u64 {
        let text = response.text();
        let start = text.rfind("in ").unwrap() + 3;
        let end = text[start..].find('s').unwrap() + start;
        text[start..end].parse().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_cooldown_remaining_strictly_decreases() {
        let f = fixture();
        f.tracker.observe(BOT, Some(RawPresence::Online)).await;
        let gateway = gateway(&f);

        let first = gateway.handle(Command::QueryStatus, USER, &[]).await;
        assert!(first.is_ok());
        assert!(first.text().contains("<@50>: reachable"));

        let mut last = u64::MAX;
        for _ in 0..3 {
            let refused = gateway.handle(Command::QueryStatus, USER, &[]).await;
            assert!(!refused.is_ok());
            let remaining = remaining_of(&refused);
            assert!(remaining < last);
            last = remaining;
            tokio::time::advance(Duration::from_secs(7)).await;
        }

        assert!(gateway.handle(Command::QueryStatus, OTHER, &[]).await.is_ok());
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(gateway.handle(Command::QueryStatus, USER, &[]).await.is_ok());
    }

    #[tokio::test]
    async fn test_status_reports_unknown_before_first_sighting() {
        let f = fixture();
        let response = gateway(&f).handle(Command::QueryStatus, USER, &[]).await;
        assert!(response.text().contains("<@50>: unknown"));
    }

    #[tokio::test]
    async fn test_summary_requires_admin() {
        let f = fixture();
        let gateway = gateway(&f);
        let refused = gateway.handle(Command::Summary, USER, &[]).await;
        assert_eq!(
            refused,
            Response::Rejected("You are not allowed to use `summary`.".into())
        );

        f.platform.add_resource(ResourceInfo {
            id: ChannelId::new(5),
            name: "old".into(),
            parent: Some(ARCHIVE),
            owner: None,
            created_at: Utc::now(),
            last_activity_at: None,
        });
        gateway.handle(Command::EnsureResource, USER, &[]).await;

        let summary = gateway.handle(Command::Summary, ADMIN, &[]).await;
        assert!(summary.is_ok());
        assert!(summary.text().contains("Active resources: 1"));
        assert!(summary.text().contains("Archived resources: 1"));
        assert!(summary.text().contains("Created in the last 24h: 1"));
    }

    #[tokio::test]
    async fn test_ensure_self_vs_admin_sweep() {
        let f = fixture();
        let gateway = gateway(&f);

        let own = gateway.handle(Command::EnsureResource, USER, &[]).await;
        assert!(own.text().contains("Created your private channel"));
        assert_eq!(f.platform.resources_in(ACTIVE).len(), 1);

        let sweep = gateway.handle(Command::EnsureResource, ADMIN, &[]).await;
        assert!(sweep.text().contains("1 created"));
        assert_eq!(f.platform.resources_in(ACTIVE).len(), 2);
    }

    #[tokio::test]
    async fn test_restart_failure_does_not_consume_cooldown() {
        let f = fixture();
        let gateway = gateway(&f).with_restart_relay(closed_port_relay());

        let failed = gateway.handle(Command::RequestRestart, USER, &[]).await;
        assert!(!failed.is_ok());
        assert!(failed.text().contains("failed"));
        assert!(gateway.cooldowns().is_empty());

        let retried = gateway.handle(Command::RequestRestart, USER, &[]).await;
        assert!(retried.text().contains("failed"));
    }

    #[tokio::test]
    async fn test_restart_global_cooldown_blocks_everyone() {
        let f = fixture();
        let gateway = gateway(&f).with_restart_relay(accepting_relay().await);

        let sent = gateway
            .handle(Command::RequestRestart, USER, &["stuck".to_string()])
            .await;
        assert!(sent.is_ok());

        let other = gateway.handle(Command::RequestRestart, OTHER, &[]).await;
        assert!(other.text().contains("on cooldown"));
        assert!(
            gateway
                .cooldowns()
                .remaining(CooldownKey::User(Command::RequestRestart, OTHER))
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_handle_message_ignores_self_and_noise() {
        let f = fixture();
        let gateway = gateway(&f);
        assert!(gateway.handle_message(SERVICE, "!status").await.is_none());
        assert!(gateway.handle_message(USER, "hello").await.is_none());
        assert!(gateway.handle_message(USER, "!status").await.is_some());
    }
}
