//! Permission bit handling.

use statuswatch_core::types::{AccessRule, AccessSubject, GuildId, RoleId, UserId};

use crate::model::{ApiGuild, ApiOverwrite, OVERWRITE_MEMBER, OVERWRITE_ROLE};

pub const ADMINISTRATOR: u64 = 1 << 3;
pub const VIEW_CHANNEL: u64 = 1 << 10;
pub const SEND_MESSAGES: u64 = 1 << 11;
pub const READ_MESSAGE_HISTORY: u64 = 1 << 16;

/// Bits granted to a resource's owner and the service account.
pub const MEMBER_ACCESS: u64 = VIEW_CHANNEL | SEND_MESSAGES | READ_MESSAGE_HISTORY;

fn bits(raw: &str) -> u64 {
    raw.parse().unwrap_or(0)
}

/// Whether a member with `roles` has administrator rights in `guild`.
///
/// The guild owner always does; otherwise the `@everyone` role (whose id is
/// the guild id) and every held role are combined.
pub fn is_admin(guild: &ApiGuild, user: UserId, roles: &[RoleId]) -> bool {
    if guild.owner_id == user {
        return true;
    }
    let everyone = RoleId::new(guild.id.get());
    let combined = guild
        .roles
        .iter()
        .filter(|r| r.id == everyone || roles.contains(&r.id))
        .fold(0u64, |acc, r| acc | bits(&r.permissions));
    combined & ADMINISTRATOR != 0
}

/// Channel overwrites expressing `rules`.
pub fn overwrites_for(guild: GuildId, rules: &[AccessRule]) -> Vec<ApiOverwrite> {
    rules
        .iter()
        .map(|rule| {
            let (id, kind, bitset) = match rule.subject {
                AccessSubject::Everyone => (guild.to_string(), OVERWRITE_ROLE, VIEW_CHANNEL),
                AccessSubject::Member(user) => (user.to_string(), OVERWRITE_MEMBER, MEMBER_ACCESS),
            };
            let (allow, deny) = if rule.allow { (bitset, 0) } else { (0, bitset) };
            ApiOverwrite {
                id,
                kind,
                allow: allow.to_string(),
                deny: deny.to_string(),
            }
        })
        .collect()
}

/// The member a channel is private to: the single member overwrite granting
/// view access other than the service account.
pub fn owner_from_overwrites(overwrites: &[ApiOverwrite], service: UserId) -> Option<UserId> {
    let mut owners = overwrites
        .iter()
        .filter(|o| o.kind == OVERWRITE_MEMBER && bits(&o.allow) & VIEW_CHANNEL != 0)
        .filter_map(|o| o.id.parse::<UserId>().ok())
        .filter(|id| *id != service);
    let owner = owners.next()?;
    if owners.next().is_some() { None } else { Some(owner) }
}
