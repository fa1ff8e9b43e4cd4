//! Notice severity levels.

use serde::{Deserialize, Serialize};

use statuswatch_presence::TransitionKind;

/// Severity of a transition notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Recovery or informational notice.
    Info,
    /// Loss of reachability; administrators are escalated to.
    Critical,
}

impl Severity {
    /// Severity of a transition kind.
    pub fn of(kind: TransitionKind) -> Self {
        match kind {
            TransitionKind::BecameReachable => Self::Info,
            TransitionKind::BecameUnreachable => Self::Critical,
        }
    }

    /// Whether notices of this severity ping the escalation list.
    pub fn escalates(&self) -> bool {
        matches!(self, Self::Critical)
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Critical => "critical",
        }
    }
}
