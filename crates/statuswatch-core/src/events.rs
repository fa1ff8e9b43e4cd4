//! Normalized inbound platform events.
//!
//! Whatever transport feeds the watcher (a gateway session, a poll timer, a
//! test harness) produces these; the event loop consumes nothing else.

use crate::types::{ChannelId, RawPresence, UserId};

/// An event received from the collaboration platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    /// The platform session is established and caches are primed.
    Ready,
    /// An account's presence changed. `None` means the account left the
    /// workspace or is not visible in it.
    PresenceChanged {
        /// The account.
        entity: UserId,
        /// New raw status.
        status: Option<RawPresence>,
    },
    /// A text message was posted.
    MessageReceived {
        /// Author of the message.
        author: UserId,
        /// Channel the message was posted in.
        channel: ChannelId,
        /// Raw message text.
        text: String,
    },
    /// A member joined the workspace.
    MemberJoined {
        /// The new member.
        member: UserId,
    },
    /// A member left or was removed from the workspace.
    MemberRemoved {
        /// The departed member.
        member: UserId,
    },
}

impl PlatformEvent {
    /// Short name used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::PresenceChanged { .. } => "presence_changed",
            Self::MessageReceived { .. } => "message_received",
            Self::MemberJoined { .. } => "member_joined",
            Self::MemberRemoved { .. } => "member_removed",
        }
    }
}
