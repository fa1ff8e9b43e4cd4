//! Shared domain types: ids, presence, members, resources, and messages.

pub mod id;
pub mod member;
pub mod message;
pub mod presence;
pub mod resource;

pub use id::{ChannelId, GuildId, RoleId, UserId};
pub use member::{Member, Role};
pub use message::{Embed, EmbedField, MessagePayload};
pub use presence::RawPresence;
pub use resource::{AccessRule, AccessSubject, ResourceInfo};
