//! Statuswatch: bot reachability watcher and member channel provisioner.
//!
//! Main entry point that wires all crates together and runs until signalled.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use statuswatch_commands::CommandGateway;
use statuswatch_core::config::AppConfig;
use statuswatch_core::error::AppError;
use statuswatch_core::traits::platform::Platform;
use statuswatch_discord::{DiscordPlatform, Gateway, PresenceCache};
use statuswatch_notify::{NotificationDispatcher, WebhookClient};
use statuswatch_presence::{PresenceTracker, StateStore};
use statuswatch_provision::{ArchivalSweeper, ArchivePolicy, ResourceProvisioner};
use statuswatch_worker::tasks::{
    ArchivalSweepTask, CooldownPruneTask, PresencePollTask, ProvisioningSweepTask,
};
use statuswatch_worker::{EventLoop, TaskScheduler};

/// Capacity of the gateway → event loop channel.
const EVENT_BUFFER: usize = 256;

/// How long shutdown waits for each background task.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(15);

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "statuswatch", version, about)]
struct Cli {
    /// Extra configuration file merged over `config/default.toml`
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Environment overlay (`config/{env}.toml`)
    #[arg(short, long, env = "STATUSWATCH_ENV", default_value = "development")]
    env: String,

    /// Validate the configuration and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::load(&cli.env, cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    if cli.check_config {
        println!("Configuration OK (env: {})", cli.env);
        return;
    }

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Watcher error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main watcher run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Statuswatch v{}", env!("CARGO_PKG_VERSION"));

    let guild = config.guild_id()?;
    let status_channel = config.status_channel_id()?;

    // ── Step 1: Create state directory ───────────────────────────
    let state_file = PathBuf::from(&config.monitor.state_file);
    if let Some(parent) = state_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            AppError::storage(format!(
                "Failed to create state directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    // ── Step 2: Connect to the platform ──────────────────────────
    let presences = Arc::new(PresenceCache::new());
    let discord = DiscordPlatform::connect(&config.platform, guild, Arc::clone(&presences)).await?;
    let platform: Arc<dyn Platform> = Arc::new(discord);

    // ── Step 3: Restore presence state ───────────────────────────
    let store = Arc::new(StateStore::new(state_file));
    let tracker = Arc::new(
        PresenceTracker::restore(Arc::clone(&store), config.monitor.entity_ids.clone()).await,
    );
    tracing::info!(
        monitored = tracker.monitored().len(),
        "Presence tracker ready"
    );

    // ── Step 4: Notification dispatcher ──────────────────────────
    let request_timeout = Duration::from_secs(config.platform.request_timeout_seconds);
    let mut dispatcher = NotificationDispatcher::new(
        Arc::clone(&platform),
        status_channel,
        config.notify.escalation_ids.clone(),
    );
    if let Some(ref url) = config.notify.webhook_url {
        dispatcher = dispatcher.with_webhook(WebhookClient::new(url.clone(), request_timeout)?);
    }
    if let Some(channel) = config.notify.log_channel_id {
        dispatcher = dispatcher.with_log_channel(channel);
    }
    let dispatcher = Arc::new(dispatcher);

    // ── Step 5: Provisioning and archival ────────────────────────
    let provisioning = match config.containers()? {
        Some((active, archive)) => {
            let provisioner = Arc::new(ResourceProvisioner::new(
                Arc::clone(&platform),
                active,
                config.provisioning.ignore_roles.clone(),
                config.provisioning.designated_role.clone(),
                config.provisioning.creation_window_hours,
            ));
            let sweeper = Arc::new(
                ArchivalSweeper::new(
                    Arc::clone(&platform),
                    active,
                    archive,
                    ArchivePolicy {
                        inactivity_threshold_days: config.archive.inactivity_threshold_days,
                    },
                )
                .with_lock(provisioner.container_lock()),
            );
            tracing::info!(
                active = %active,
                archive = %archive,
                "Provisioning enabled"
            );
            Some((provisioner, sweeper, archive))
        }
        None => {
            tracing::info!("Provisioning disabled");
            None
        }
    };

    // ── Step 6: Command gateway ──────────────────────────────────
    let mut commands = CommandGateway::new(
        Arc::clone(&platform),
        Arc::clone(&tracker),
        config.commands.clone(),
    );
    if let Some((ref provisioner, _, archive)) = provisioning {
        commands = commands.with_provisioner(Arc::clone(provisioner), archive);
    }
    if let Some(url) = config.restart_webhook_url() {
        commands = commands.with_restart_relay(WebhookClient::new(url, request_timeout)?);
    }
    let commands = Arc::new(commands);

    // ── Step 7: Scheduled tasks ──────────────────────────────────
    let mut scheduler = TaskScheduler::new().await?;
    scheduler
        .register(Arc::new(PresencePollTask::new(
            Arc::clone(&platform),
            Arc::clone(&tracker),
            Arc::clone(&dispatcher),
            Duration::from_secs(config.monitor.check_interval_seconds),
        )))
        .await?;
    scheduler
        .register(Arc::new(CooldownPruneTask::new(Arc::clone(&commands))))
        .await?;
    if let Some((ref provisioner, ref sweeper, _)) = provisioning {
        scheduler
            .register(Arc::new(ProvisioningSweepTask::new(
                Arc::clone(provisioner),
                hours(config.provisioning.sweep_interval_hours),
            )))
            .await?;
        scheduler
            .register(Arc::new(ArchivalSweepTask::new(
                Arc::clone(sweeper),
                hours(config.archive.sweep_interval_hours),
            )))
            .await?;
    }
    scheduler.start().await?;
    tracing::info!(tasks = ?scheduler.registered(), "Scheduler started");

    // ── Step 8: Gateway and event loop ───────────────────────────
    let cancel = CancellationToken::new();
    let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);

    let gateway = Gateway::new(&config.platform, guild, presences, events_tx);
    let gateway_handle = tokio::spawn(gateway.run(cancel.clone()));

    let mut event_loop = EventLoop::new(
        Arc::clone(&platform),
        Arc::clone(&tracker),
        Arc::clone(&dispatcher),
        Arc::clone(&commands),
        config.notify.announce_startup,
    );
    if let Some((provisioner, sweeper, _)) = provisioning {
        event_loop = event_loop.with_provisioning(provisioner, sweeper);
    }
    let event_handle = tokio::spawn(Arc::new(event_loop).run(events_rx, cancel.clone()));

    tracing::info!(guild = %guild, "Statuswatch running");

    // ── Step 9: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
    cancel.cancel();

    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!(error = %e, "Scheduler shutdown failed");
    }

    tracing::info!("Waiting for background tasks to complete...");
    for (name, handle) in [("gateway", gateway_handle), ("event loop", event_handle)] {
        match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(task = name, error = %e, "Background task panicked"),
            Err(_) => tracing::warn!(task = name, "Background task did not stop in time"),
        }
    }

    tracker.flush().await;
    tracing::info!("Statuswatch stopped");
    Ok(())
}

fn hours(h: u64) -> Duration {
    Duration::from_secs(h.saturating_mul(3600))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
