//! Point-in-time view of a container's resource names.

use std::collections::{HashMap, HashSet};

use statuswatch_core::types::{ResourceInfo, UserId};

/// Names (and owners) of the resources inside one container.
///
/// Names are compared case-insensitively. A provisioning pass appends every
/// resource it creates, so iterating many members against one snapshot
/// never creates the same name twice.
#[derive(Debug, Clone, Default)]
pub struct ContainerSnapshot {
    /// Lowercased name → owner, if known
    by_name: HashMap<String, Option<UserId>>,
    /// Members owning at least one resource
    owners: HashSet<UserId>,
}

impl ContainerSnapshot {
    /// Build from a container listing.
    pub fn from_resources(resources: &[ResourceInfo]) -> Self {
        let mut snapshot = Self::default();
        for r in resources {
            snapshot.insert(&r.name, r.owner);
        }
        snapshot
    }

    /// Whether a resource named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(&name.to_lowercase())
    }

    /// Owner lookup: `None` if no such name, `Some(None)` if the name exists
    /// with no identifiable owner.
    pub fn owner_of(&self, name: &str) -> Option<Option<UserId>> {
        self.by_name.get(&name.to_lowercase()).copied()
    }

    /// Whether `member` already owns a resource here.
    pub fn owns(&self, member: UserId) -> bool {
        self.owners.contains(&member)
    }

    /// Record a resource.
    pub fn insert(&mut self, name: &str, owner: Option<UserId>) {
        self.by_name.insert(name.to_lowercase(), owner);
        if let Some(owner) = owner {
            self.owners.insert(owner);
        }
    }
}
