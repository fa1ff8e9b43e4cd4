//! Per-user resources (private channels) and their access rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ChannelId, UserId};

/// A resource as listed from a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    /// Resource id.
    pub id: ChannelId,
    /// Resource name.
    pub name: String,
    /// Container currently holding the resource.
    pub parent: Option<ChannelId>,
    /// The member the resource was provisioned for, when identifiable.
    pub owner: Option<UserId>,
    /// When the resource was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recent content event, if any.
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl ResourceInfo {
    /// Most recent content activity, falling back to creation time.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity_at.unwrap_or(self.created_at)
    }
}

/// Who an access rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "id")]
pub enum AccessSubject {
    /// Every member of the workspace.
    Everyone,
    /// A single account.
    Member(UserId),
}

/// A single grant or denial of visibility on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    /// Subject of the rule.
    pub subject: AccessSubject,
    /// `true` grants access, `false` denies it.
    pub allow: bool,
}

impl AccessRule {
    /// Rules restricting a resource to its owner and the controlling
    /// service account.
    pub fn private_to(owner: UserId, service: UserId) -> Vec<AccessRule> {
        vec![
            AccessRule {
                subject: AccessSubject::Everyone,
                allow: false,
            },
            AccessRule {
                subject: AccessSubject::Member(owner),
                allow: true,
            },
            AccessRule {
                subject: AccessSubject::Member(service),
                allow: true,
            },
        ]
    }
}
