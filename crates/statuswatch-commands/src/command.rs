//! Command names and message parsing.

use std::fmt;

/// A recognized chat command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Report last-known reachability of monitored bots.
    QueryStatus,
    /// Health and provisioning summary.
    Summary,
    /// Provision a private resource.
    EnsureResource,
    /// Relay a restart request.
    RequestRestart,
}

impl Command {
    /// Canonical name, as typed after the prefix.
    pub fn name(&self) -> &'static str {
        match self {
            Self::QueryStatus => "status",
            Self::Summary => "summary",
            Self::EnsureResource => "ensure",
            Self::RequestRestart => "restart",
        }
    }

    /// Resolve a typed name or alias (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "status" | "query-status" => Some(Self::QueryStatus),
            "summary" | "health" => Some(Self::Summary),
            "ensure" | "ensure-channel" | "ensure-resource" => Some(Self::EnsureResource),
            "restart" | "request-restart" => Some(Self::RequestRestart),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A command with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Which command
    pub command: Command,
    /// Whitespace-separated arguments
    pub args: Vec<String>,
}

/// Parse a chat message into a command.
///
/// Returns `None` for messages without the prefix and for unknown commands,
/// which are ignored rather than answered.
pub fn parse(prefix: &str, text: &str) -> Option<ParsedCommand> {
    let text = text.trim();
    let body = text.strip_prefix(prefix)?;
    let mut words = body.split_whitespace();
    let command = Command::from_name(words.next()?)?;
    Some(ParsedCommand {
        command,
        args: words.map(str::to_string).collect(),
    })
}
