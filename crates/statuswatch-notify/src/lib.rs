//! # statuswatch-notify
//!
//! Turns presence transitions into notices and delivers them:
//!
//! - Severity classification (escalation on "became unreachable")
//! - Notice formatting for the status channel and the webhook mirror
//! - Webhook relay over HTTP with a bounded timeout
//! - Fire-and-forget dispatch with failure logging and log-channel mirroring

pub mod dispatcher;
pub mod formatter;
pub mod severity;
pub mod webhook;

pub use dispatcher::{Delivered, DeliveryError, DeliveryTarget, NotificationDispatcher};
pub use severity::Severity;
pub use webhook::{WebhookClient, WebhookPayload};
