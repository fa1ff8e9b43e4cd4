//! Status classes and transitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use statuswatch_core::types::presence::presence_str;
use statuswatch_core::types::{RawPresence, UserId};

/// Reachability bucket a raw presence collapses into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    /// Connected in any visible state.
    Reachable,
    /// Offline, invisible, or absent from the workspace.
    Unreachable,
}

impl StatusClass {
    /// Classify a raw presence. An absent entity is unreachable.
    pub fn classify(raw: Option<RawPresence>) -> Self {
        match raw {
            Some(RawPresence::Online | RawPresence::Idle | RawPresence::DoNotDisturb) => {
                Self::Reachable
            }
            Some(RawPresence::Invisible | RawPresence::Offline) | None => Self::Unreachable,
        }
    }

    /// Parses the persisted string form.
    pub fn from_str_value(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "reachable" => Some(Self::Reachable),
            "unreachable" => Some(Self::Unreachable),
            _ => None,
        }
    }

    /// Converts to the persisted string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reachable => "reachable",
            Self::Unreachable => "unreachable",
        }
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a class-boundary crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionKind {
    /// unreachable → reachable
    BecameReachable,
    /// reachable → unreachable
    BecameUnreachable,
}

/// A confirmed crossing between status classes for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// The entity that crossed.
    pub entity: UserId,
    /// Class before the crossing.
    pub from: StatusClass,
    /// Class after the crossing.
    pub to: StatusClass,
    /// Raw presence last seen in the previous class, if known.
    pub previous_raw: Option<RawPresence>,
    /// Raw presence that triggered the crossing (`None` = not in workspace).
    pub current_raw: Option<RawPresence>,
}

impl Transition {
    /// Classification of the crossing.
    pub fn kind(&self) -> TransitionKind {
        match self.to {
            StatusClass::Reachable => TransitionKind::BecameReachable,
            StatusClass::Unreachable => TransitionKind::BecameUnreachable,
        }
    }

    /// Single-line summary for logs and webhooks.
    pub fn summary(&self) -> String {
        let previous = match self.previous_raw {
            Some(raw) => raw.as_str(),
            None => self.from.as_str(),
        };
        format!(
            "{} status changed: `{}` → `{}`",
            self.entity.mention(),
            previous,
            presence_str(self.current_raw)
        )
    }
}
