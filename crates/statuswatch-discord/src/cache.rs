//! Gateway-fed presence cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;

use statuswatch_core::types::{RawPresence, UserId};

/// Last presence reported by the gateway for each account.
///
/// Discord only reports presences for accounts that are not offline, so once
/// the guild snapshot has arrived a member with no entry is offline. Before
/// that a missing entry means nothing.
#[derive(Debug, Default)]
pub struct PresenceCache {
    entries: DashMap<UserId, RawPresence>,
    /// Set once a full guild snapshot has been applied
    synced: AtomicBool,
}

impl PresenceCache {
    /// Create an empty, unsynced cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a presence; `None` forgets the account.
    pub fn update(&self, entity: UserId, presence: Option<RawPresence>) {
        match presence {
            Some(p) => {
                self.entries.insert(entity, p);
            }
            None => {
                self.entries.remove(&entity);
            }
        }
    }

    /// Swap in a full guild snapshot and mark the cache synced.
    ///
    /// New entries are written before stale ones are dropped, so a reader
    /// never sees a snapshot account as missing mid-swap.
    pub fn replace(&self, snapshot: impl IntoIterator<Item = (UserId, RawPresence)>) {
        let snapshot: HashMap<UserId, RawPresence> = snapshot.into_iter().collect();
        for (&entity, &presence) in &snapshot {
            self.entries.insert(entity, presence);
        }
        self.entries.retain(|entity, _| snapshot.contains_key(entity));
        self.synced.store(true, Ordering::Release);
    }

    /// Whether a guild snapshot has been applied.
    pub fn is_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }

    /// Cached presence.
    pub fn get(&self, entity: UserId) -> Option<RawPresence> {
        self.entries.get(&entity).map(|r| *r.value())
    }
}
