//! Command replies and rejection reasons.

use std::time::Duration;

use statuswatch_core::error::AppError;
use statuswatch_core::types::MessagePayload;

use crate::command::Command;

/// Why a command was not carried out.
#[derive(Debug, thiserror::Error)]
pub enum CommandRejection {
    /// The invoker may not use this command.
    #[error("You are not allowed to use `{0}`.")]
    Unauthorized(Command),

    /// The command is cooling down.
    #[error("`{command}` is on cooldown. Try again in {}s.", ceil_secs(.remaining))]
    CooldownActive {
        /// Command that was refused
        command: Command,
        /// Time until it may be used again
        remaining: Duration,
        /// Whether the global (rather than per-user) window blocked it
        global: bool,
    },

    /// The command depends on something that is not configured.
    #[error("`{0}` is not available: {1}")]
    Unavailable(Command, &'static str),

    /// The platform or relay failed.
    #[error("`{command}` failed: {source}")]
    Failed {
        /// Command that failed
        command: Command,
        /// Underlying error
        #[source]
        source: AppError,
    },
}

fn ceil_secs(d: &Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

/// Reply to a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The command ran; text to post.
    Ok(String),
    /// The command was refused or failed; text to post.
    Rejected(String),
}

impl Response {
    /// Text of the reply.
    pub fn text(&self) -> &str {
        match self {
            Self::Ok(text) | Self::Rejected(text) => text,
        }
    }

    /// Whether the command ran.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Chat message carrying the reply. Replies never ping anyone.
    pub fn into_payload(self) -> MessagePayload {
        match self {
            Self::Ok(text) => MessagePayload::text(text),
            Self::Rejected(text) => MessagePayload::text(format!("⚠️ {text}")),
        }
    }
}

impl From<CommandRejection> for Response {
    fn from(rejection: CommandRejection) -> Self {
        Self::Rejected(rejection.to_string())
    }
}
