//! Workspace members and their roles.

use serde::{Deserialize, Serialize};

use super::id::{RoleId, UserId};

/// A role (access tag) as seen by the watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role id.
    pub id: RoleId,
    /// Display name of the role.
    pub name: String,
}

/// A member of the shared workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Account id.
    pub id: UserId,
    /// Name shown in the workspace (nickname, global name, or username).
    pub display_name: String,
    /// Whether the account is a non-human service account.
    pub is_bot: bool,
    /// Whether the member holds administrator privilege.
    pub is_admin: bool,
    /// Roles currently held.
    pub roles: Vec<Role>,
}

impl Member {
    /// Whether the member holds the given role.
    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.iter().any(|r| r.id == role)
    }

    /// Whether any held role's name appears in `names` (case-insensitive).
    pub fn has_any_role_named(&self, names: &[String]) -> bool {
        self.roles
            .iter()
            .any(|r| names.iter().any(|n| n.eq_ignore_ascii_case(&r.name)))
    }
}
