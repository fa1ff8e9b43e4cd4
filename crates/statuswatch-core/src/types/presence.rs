//! Raw presence values as reported by the platform.

use serde::{Deserialize, Serialize};

/// Presence status exactly as the platform reports it for an account.
///
/// An account that cannot be found in the workspace has no `RawPresence`
/// at all; callers model that case as `Option::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawPresence {
    /// Connected and active.
    Online,
    /// Connected but idle.
    Idle,
    /// Connected, do not disturb.
    #[serde(rename = "dnd")]
    DoNotDisturb,
    /// Connected but hiding its presence.
    Invisible,
    /// Not connected.
    Offline,
}

impl RawPresence {
    /// Parses the platform's presence string. Unrecognized values are
    /// treated as offline so that an unexpected value never reads as
    /// "reachable".
    pub fn from_str_value(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "online" | "active" => Self::Online,
            "idle" => Self::Idle,
            "dnd" | "do_not_disturb" | "busy" => Self::DoNotDisturb,
            "invisible" => Self::Invisible,
            _ => Self::Offline,
        }
    }

    /// Converts to the platform's string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Idle => "idle",
            Self::DoNotDisturb => "dnd",
            Self::Invisible => "invisible",
            Self::Offline => "offline",
        }
    }

    /// Human-friendly label used in notices.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Online => "Online",
            Self::Idle => "Idle",
            Self::DoNotDisturb => "Dnd",
            Self::Invisible => "Invisible",
            Self::Offline => "Offline",
        }
    }
}

/// Label for an optional presence, where `None` means the account is not
/// present in the workspace.
pub fn presence_label(presence: Option<RawPresence>) -> &'static str {
    match presence {
        Some(p) => p.label(),
        None => "Not in guild / unreachable",
    }
}

/// Wire form for an optional presence (`not_in_guild` when absent).
pub fn presence_str(presence: Option<RawPresence>) -> &'static str {
    match presence {
        Some(p) => p.as_str(),
        None => "not_in_guild",
    }
}
