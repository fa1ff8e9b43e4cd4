//! Outbound message payloads.

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Colour used for "became reachable" and startup notices.
pub const COLOR_GREEN: u32 = 0x2ecc71;
/// Colour used for "became unreachable" notices.
pub const COLOR_RED: u32 = 0xe74c3c;

/// A field inside an embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    /// Field title.
    pub name: String,
    /// Field body.
    pub value: String,
    /// Whether the field is rendered inline.
    pub inline: bool,
}

/// A rich notice attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Embed {
    /// Title line.
    pub title: String,
    /// Body text.
    pub description: String,
    /// Sidebar colour.
    pub color: u32,
    /// Additional fields.
    pub fields: Vec<EmbedField>,
    /// Footer text.
    pub footer: Option<String>,
}

impl Embed {
    /// Create an embed with a title, description, and colour.
    pub fn new(title: impl Into<String>, description: impl Into<String>, color: u32) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            color,
            ..Self::default()
        }
    }

    /// Append an inline field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline: true,
        });
        self
    }

    /// Set the footer.
    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(text.into());
        self
    }
}

/// A message to post into a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MessagePayload {
    /// Plain text content.
    pub content: Option<String>,
    /// Optional rich notice.
    pub embed: Option<Embed>,
    /// Users that may be pinged by mentions in `content`.
    pub mention_users: Vec<UserId>,
}

impl MessagePayload {
    /// A plain text message that pings nobody.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// A message carrying only an embed.
    pub fn embed(embed: Embed) -> Self {
        Self {
            embed: Some(embed),
            ..Self::default()
        }
    }

    /// Set the text content.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Allow the listed users to be pinged.
    pub fn with_mentions(mut self, users: impl IntoIterator<Item = UserId>) -> Self {
        self.mention_users.extend(users);
        self
    }
}
