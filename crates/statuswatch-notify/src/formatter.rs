//! Notice formatting for transitions and watcher lifecycle events.

use statuswatch_core::types::message::{COLOR_GREEN, COLOR_RED};
use statuswatch_core::types::presence::presence_label;
use statuswatch_core::types::{Embed, MessagePayload, UserId};
use statuswatch_presence::{StatusClass, Transition, TransitionKind};

use crate::severity::Severity;
use crate::webhook::WebhookPayload;

/// Footer attached to every embed.
pub const FOOTER: &str = "Status Watcher";

/// Formats notices for common events.
pub struct NotificationFormatter;

impl NotificationFormatter {
    /// Emoji marking a transition kind.
    pub fn emoji(kind: TransitionKind) -> &'static str {
        match kind {
            TransitionKind::BecameReachable => "🟢",
            TransitionKind::BecameUnreachable => "🔴",
        }
    }

    /// Formats the status-channel notice for a transition.
    ///
    /// Critical notices mention the escalation list in the message content
    /// and allow exactly those users to be pinged.
    pub fn transition(transition: &Transition, escalation: &[UserId]) -> MessagePayload {
        let kind = transition.kind();
        let mention = transition.entity.mention();
        let emoji = Self::emoji(kind);
        let current = presence_label(transition.current_raw);

        let (title, description, color) = match kind {
            TransitionKind::BecameReachable => (
                "Bot is back online",
                format!("{emoji} {mention} is now **Online**.\nNew status: `{current}`"),
                COLOR_GREEN,
            ),
            TransitionKind::BecameUnreachable => (
                "Bot went offline",
                format!(
                    "{emoji} {mention} is now **Offline / Sleeping**.\nNew status: `{current}`"
                ),
                COLOR_RED,
            ),
        };

        let embed = Embed::new(title, description, color)
            .field("Previous status", format!("`{}`", Self::previous_label(transition)))
            .field("Current status", format!("`{current}`"))
            .footer(FOOTER);

        let payload = MessagePayload::embed(embed);
        if Severity::of(kind).escalates() && !escalation.is_empty() {
            let pings = escalation
                .iter()
                .map(|id| id.mention())
                .collect::<Vec<_>>()
                .join(" ");
            payload
                .with_content(format!("{pings} {mention} needs attention"))
                .with_mentions(escalation.iter().copied())
        } else {
            payload
        }
    }

    /// Formats the one-line webhook mirror of a transition.
    pub fn transition_webhook(transition: &Transition) -> WebhookPayload {
        WebhookPayload::new(format!(
            "{} {}",
            Self::emoji(transition.kind()),
            transition.summary()
        ))
    }

    /// Formats the notice posted when the watcher comes online.
    pub fn startup(monitored: &[UserId]) -> MessagePayload {
        let description = if monitored.is_empty() {
            "✅ Status watcher started. No bots are configured for monitoring.".to_string()
        } else {
            format!(
                "✅ Status watcher started and is now monitoring {} configured bot(s).",
                monitored.len()
            )
        };
        MessagePayload::embed(
            Embed::new("Status Watcher Online", description, COLOR_GREEN).footer(FOOTER),
        )
    }

    /// Formats the log-channel mirror of a failed delivery.
    pub fn delivery_failure(transition: &Transition, reason: &str) -> MessagePayload {
        MessagePayload::text(format!(
            "⚠️ Failed to deliver {:?} notice for {}: {}",
            transition.kind(),
            transition.entity.mention(),
            reason
        ))
    }

    fn previous_label(transition: &Transition) -> &'static str {
        match (transition.previous_raw, transition.from) {
            (Some(raw), _) => raw.label(),
            (None, StatusClass::Reachable) => "Reachable",
            (None, StatusClass::Unreachable) => "Unreachable",
        }
    }
}
