//! Discord wire types.
//!
//! Only the fields the watcher reads are modelled; everything else in the
//! payloads is ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use statuswatch_core::types::{ChannelId, GuildId, RoleId, UserId};

/// Guild text channel.
pub const CHANNEL_TYPE_TEXT: u8 = 0;
/// Permission overwrite targeting a role.
pub const OVERWRITE_ROLE: u8 = 0;
/// Permission overwrite targeting a member.
pub const OVERWRITE_MEMBER: u8 = 1;

/// A user account.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
    pub id: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

/// A guild member.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMember {
    pub user: Option<ApiUser>,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<RoleId>,
}

impl ApiMember {
    /// Name shown in the guild: nickname, then global name, then username.
    pub fn display_name(&self) -> String {
        self.nick
            .clone()
            .or_else(|| self.user.as_ref().and_then(|u| u.global_name.clone()))
            .or_else(|| self.user.as_ref().map(|u| u.username.clone()))
            .unwrap_or_default()
    }
}

/// A guild role.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiRole {
    pub id: RoleId,
    pub name: String,
    /// Permission bitset as a decimal string
    #[serde(default)]
    pub permissions: String,
}

/// The subset of a guild object needed for permission checks.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiGuild {
    pub id: GuildId,
    pub owner_id: UserId,
    #[serde(default)]
    pub roles: Vec<ApiRole>,
}

/// A permission overwrite on a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiOverwrite {
    /// Role or user id, as a string
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub allow: String,
    #[serde(default)]
    pub deny: String,
}

/// A guild channel.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiChannel {
    pub id: ChannelId,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parent_id: Option<ChannelId>,
    #[serde(default)]
    pub last_message_id: Option<String>,
    #[serde(default)]
    pub permission_overwrites: Vec<ApiOverwrite>,
}

/// Raw gateway frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPayload {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
}

/// Gateway opcodes.
pub mod opcode {
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const RECONNECT: u8 = 7;
    pub const INVALID_SESSION: u8 = 9;
    pub const HELLO: u8 = 10;
    pub const HEARTBEAT_ACK: u8 = 11;
}

/// Gateway intents requested on identify.
pub mod intents {
    pub const GUILDS: u64 = 1 << 0;
    pub const GUILD_MEMBERS: u64 = 1 << 1;
    pub const GUILD_PRESENCES: u64 = 1 << 8;
    pub const GUILD_MESSAGES: u64 = 1 << 9;
    pub const MESSAGE_CONTENT: u64 = 1 << 15;

    /// Everything the watcher consumes.
    pub const WATCHER: u64 =
        GUILDS | GUILD_MEMBERS | GUILD_PRESENCES | GUILD_MESSAGES | MESSAGE_CONTENT;
}
