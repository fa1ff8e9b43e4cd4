//! Notification dispatcher: routes transition notices to the status channel
//! and the webhook mirror.
//!
//! Dispatch runs after the tracker has already persisted the transition, so a
//! failed delivery never rolls anything back. Failures are logged and, when a
//! log channel is configured, mirrored there. Nothing is retried.

use std::fmt;
use std::sync::Arc;

use tracing;

use statuswatch_core::error::AppError;
use statuswatch_core::result::AppResult;
use statuswatch_core::traits::platform::Platform;
use statuswatch_core::types::{ChannelId, UserId};
use statuswatch_presence::Transition;

use super::formatter::NotificationFormatter;
use super::severity::Severity;
use super::webhook::WebhookClient;

/// Where a notice was (or was meant to be) delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryTarget {
    /// The configured status channel.
    StatusChannel,
    /// The configured webhook mirror.
    Webhook,
}

impl fmt::Display for DeliveryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StatusChannel => write!(f, "status channel"),
            Self::Webhook => write!(f, "webhook"),
        }
    }
}

/// Successful delivery report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    /// Targets that accepted the notice.
    pub targets: Vec<DeliveryTarget>,
    /// Severity of the delivered notice.
    pub severity: Severity,
}

/// At least one configured target rejected the notice.
#[derive(Debug, thiserror::Error)]
#[error("notice delivery failed: {}", describe(.failures))]
pub struct DeliveryError {
    /// Targets that failed, with the cause.
    pub failures: Vec<(DeliveryTarget, AppError)>,
    /// Targets that accepted the notice anyway.
    pub delivered: Vec<DeliveryTarget>,
}

fn describe(failures: &[(DeliveryTarget, AppError)]) -> String {
    failures
        .iter()
        .map(|(target, err)| format!("{target}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Renders and delivers transition notices.
#[derive(Debug)]
pub struct NotificationDispatcher {
    /// Platform used to post channel messages
    platform: Arc<dyn Platform>,
    /// Channel receiving transition notices
    status_channel: ChannelId,
    /// Channel mirroring delivery failures
    log_channel: Option<ChannelId>,
    /// Optional webhook mirror
    webhook: Option<WebhookClient>,
    /// Administrators pinged on critical notices
    escalation: Vec<UserId>,
}

impl NotificationDispatcher {
    /// Create a new dispatcher
    pub fn new(
        platform: Arc<dyn Platform>,
        status_channel: ChannelId,
        escalation: Vec<UserId>,
    ) -> Self {
        Self {
            platform,
            status_channel,
            log_channel: None,
            webhook: None,
            escalation,
        }
    }

    /// Mirror every notice to a webhook.
    pub fn with_webhook(mut self, webhook: WebhookClient) -> Self {
        self.webhook = Some(webhook);
        self
    }

    /// Mirror delivery failures to a log channel.
    pub fn with_log_channel(mut self, channel: ChannelId) -> Self {
        self.log_channel = Some(channel);
        self
    }

    /// Deliver a transition notice to every configured target.
    pub async fn dispatch(&self, transition: &Transition) -> Result<Delivered, DeliveryError> {
        let severity = Severity::of(transition.kind());
        let mut delivered = Vec::new();
        let mut failures = Vec::new();

        let payload = NotificationFormatter::transition(transition, &self.escalation);
        match self.platform.send_message(self.status_channel, &payload).await {
            Ok(()) => delivered.push(DeliveryTarget::StatusChannel),
            Err(e) => failures.push((DeliveryTarget::StatusChannel, e)),
        }

        if let Some(ref webhook) = self.webhook {
            let payload = NotificationFormatter::transition_webhook(transition);
            match webhook.post(&payload).await {
                Ok(()) => delivered.push(DeliveryTarget::Webhook),
                Err(e) => failures.push((DeliveryTarget::Webhook, e)),
            }
        }

        if failures.is_empty() {
            tracing::debug!(
                entity = %transition.entity,
                severity = severity.as_str(),
                targets = delivered.len(),
                "Notice delivered"
            );
            Ok(Delivered {
                targets: delivered,
                severity,
            })
        } else {
            Err(DeliveryError {
                failures,
                delivered,
            })
        }
    }

    /// Deliver a notice, logging any failure instead of returning it.
    ///
    /// This is the fire-and-forget entry point used by the event loop.
    pub async fn dispatch_logged(&self, transition: &Transition) {
        if let Err(e) = self.dispatch(transition).await {
            self.report_failure(transition, &e).await;
        }
    }

    /// Log a failed delivery and mirror it to the log channel, if any.
    pub async fn report_failure(&self, transition: &Transition, error: &DeliveryError) {
        tracing::error!(
            entity = %transition.entity,
            kind = ?transition.kind(),
            delivered = error.delivered.len(),
            error = %error,
            "Failed to deliver transition notice"
        );

        let Some(channel) = self.log_channel else {
            return;
        };
        let notice = NotificationFormatter::delivery_failure(transition, &error.to_string());
        if let Err(e) = self.platform.send_message(channel, &notice).await {
            tracing::warn!(
                channel = %channel,
                error = %e,
                "Failed to mirror delivery failure to log channel"
            );
        }
    }

    /// Post the "watcher online" notice to the status channel.
    pub async fn announce_startup(&self, monitored: &[UserId]) -> AppResult<()> {
        let payload = NotificationFormatter::startup(monitored);
        self.platform
            .send_message(self.status_channel, &payload)
            .await
    }
}
