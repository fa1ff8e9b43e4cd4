//! Presence tracker: diffs observations against last-known state and emits
//! transitions on class-boundary crossings.
//!
//! Push events and poll ticks both end up in [`PresenceTracker::observe`].
//! Observations for one entity are serialized by a per-entity async mutex;
//! observations for different entities proceed independently. The new state
//! is persisted before `observe` returns, so by the time a caller dispatches
//! a notice for a transition the transition is already durable.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing;

use statuswatch_core::traits::platform::Platform;
use statuswatch_core::types::presence::presence_str;
use statuswatch_core::types::{RawPresence, UserId};

use super::status::{StatusClass, Transition};
use super::store::StateStore;

/// Last observation of one entity.
#[derive(Debug, Clone, Copy)]
struct Observed {
    /// Class of the last observation.
    class: StatusClass,
    /// Raw presence of the last observation, unknown after a restart.
    raw: Option<RawPresence>,
}

/// Tracks the reachability of every monitored entity.
#[derive(Debug)]
pub struct PresenceTracker {
    /// Entity ID → last observation
    statuses: DashMap<UserId, Observed>,
    /// Entity ID → serialization lock
    locks: DashMap<UserId, Arc<Mutex<()>>>,
    /// Durable backing store
    store: Arc<StateStore>,
    /// Serializes snapshot-and-save so a later snapshot never loses to an
    /// earlier one on disk
    persist_lock: Mutex<()>,
    /// Entities the watcher is configured to monitor
    monitored: Vec<UserId>,
}

impl PresenceTracker {
    /// Create a tracker with no prior state.
    pub fn new(store: Arc<StateStore>, monitored: Vec<UserId>) -> Self {
        Self {
            statuses: DashMap::new(),
            locks: DashMap::new(),
            store,
            persist_lock: Mutex::new(()),
            monitored,
        }
    }

    /// Create a tracker resuming from the store's persisted state.
    pub async fn restore(store: Arc<StateStore>, monitored: Vec<UserId>) -> Self {
        let tracker = Self::new(Arc::clone(&store), monitored);
        for (entity, class) in store.load().await {
            tracker.statuses.insert(entity, Observed { class, raw: None });
        }
        tracker
    }

    /// Record an observation and return the transition it confirms, if any.
    ///
    /// - First sighting: stored, no transition.
    /// - Same class as before: no transition (sub-state changes such as
    ///   idle ↔ online are collapsed).
    /// - Different class: stored, persisted, transition returned.
    pub async fn observe(&self, entity: UserId, raw: Option<RawPresence>) -> Option<Transition> {
        let lock = self.entity_lock(entity);
        let _guard = lock.lock().await;

        let class = StatusClass::classify(raw);
        let previous = self.statuses.get(&entity).map(|r| *r.value());
        self.statuses.insert(entity, Observed { class, raw });

        match previous {
            None => {
                tracing::info!(
                    entity = %entity,
                    status = presence_str(raw),
                    class = %class,
                    "Initial status recorded"
                );
                self.persist().await;
                None
            }
            Some(prev) if prev.class == class => {
                if prev.raw != raw {
                    tracing::debug!(
                        entity = %entity,
                        status = presence_str(raw),
                        "Presence changed within class"
                    );
                }
                None
            }
            Some(prev) => {
                self.persist().await;
                let transition = Transition {
                    entity,
                    from: prev.class,
                    to: class,
                    previous_raw: prev.raw,
                    current_raw: raw,
                };
                tracing::info!(
                    entity = %entity,
                    from = %prev.class,
                    to = %class,
                    kind = ?transition.kind(),
                    "Status transition"
                );
                Some(transition)
            }
        }
    }

    /// Poll the platform for every monitored entity and observe the result.
    ///
    /// A failed query for one entity is logged and skipped; the remaining
    /// entities are still polled.
    pub async fn poll(&self, platform: &dyn Platform) -> Vec<Transition> {
        let mut transitions = Vec::new();
        for &entity in &self.monitored {
            match platform.presence(entity).await {
                Ok(raw) => {
                    if let Some(t) = self.observe(entity, raw).await {
                        transitions.push(t);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        entity = %entity,
                        error = %e,
                        "Presence query failed, skipping this cycle"
                    );
                }
            }
        }
        transitions
    }

    /// Whether `entity` is one of the monitored entities.
    pub fn is_monitored(&self, entity: UserId) -> bool {
        self.monitored.contains(&entity)
    }

    /// The monitored entities, in configured order.
    pub fn monitored(&self) -> &[UserId] {
        &self.monitored
    }

    /// Last-known class of an entity, `None` before its first sighting.
    pub fn status_of(&self, entity: UserId) -> Option<StatusClass> {
        self.statuses.get(&entity).map(|r| r.value().class)
    }

    /// Last-known class of every monitored entity, in configured order.
    pub fn monitored_statuses(&self) -> Vec<(UserId, Option<StatusClass>)> {
        self.monitored
            .iter()
            .map(|&id| (id, self.status_of(id)))
            .collect()
    }

    /// Snapshot of every known entity's class.
    pub fn snapshot(&self) -> HashMap<UserId, StatusClass> {
        self.statuses
            .iter()
            .map(|r| (*r.key(), r.value().class))
            .collect()
    }

    /// Write the current state to the store.
    pub async fn flush(&self) {
        self.persist().await;
    }

    fn entity_lock(&self, entity: UserId) -> Arc<Mutex<()>> {
        self.locks.entry(entity).or_default().clone()
    }

    async fn persist(&self) {
        let _guard = self.persist_lock.lock().await;
        let snapshot = self.snapshot();
        if let Err(e) = self.store.save(&snapshot).await {
            tracing::error!(
                path = %self.store.path().display(),
                error = %e,
                "Failed to persist presence state"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::TransitionKind;
    use statuswatch_core::MemoryPlatform;
    use statuswatch_core::types::Member;

    const A: UserId = UserId::new(1);
    const B: UserId = UserId::new(2);

    fn tracker(dir: &tempfile::TempDir) -> PresenceTracker {
        let store = Arc::new(StateStore::new(dir.path().join("state.json")));
        PresenceTracker::new(store, vec![A, B])
    }

    #[tokio::test]
    async fn test_first_observation_never_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(&dir);
        assert!(tracker.observe(A, Some(RawPresence::Online)).await.is_none());
        assert!(tracker.observe(B, None).await.is_none());
        assert_eq!(tracker.status_of(A), Some(StatusClass::Reachable));
        assert_eq!(tracker.status_of(B), Some(StatusClass::Unreachable));
    }

    #[tokio::test]
    async fn test_unchanged_class_never_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(&dir);
        tracker.observe(A, Some(RawPresence::Online)).await;
        for raw in [
            RawPresence::Online,
            RawPresence::Idle,
            RawPresence::DoNotDisturb,
            RawPresence::Online,
        ] {
            assert!(tracker.observe(A, Some(raw)).await.is_none());
        }
    }

    #[tokio::test]
    async fn test_round_trip_produces_two_ordered_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(&dir);
        let mut seen = Vec::new();
        for raw in [
            Some(RawPresence::Online),
            Some(RawPresence::Offline),
            Some(RawPresence::Online),
        ] {
            if let Some(t) = tracker.observe(A, raw).await {
                seen.push(t.kind());
            }
        }
        assert_eq!(
            seen,
            vec![
                TransitionKind::BecameUnreachable,
                TransitionKind::BecameReachable
            ]
        );
    }

    #[tokio::test]
    async fn test_transition_is_persisted_before_return() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(StateStore::new(dir.path().join("state.json")));
        let tracker = PresenceTracker::new(Arc::clone(&store), vec![A]);
        tracker.observe(A, Some(RawPresence::Online)).await;
        let t = tracker.observe(A, Some(RawPresence::Invisible)).await;
        assert!(t.is_some());
        assert_eq!(store.load().await.get(&A), Some(&StatusClass::Unreachable));
    }

    #[tokio::test]
    async fn test_restart_resumes_without_refiring() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(StateStore::new(dir.path().join("state.json")));
        {
            let tracker = PresenceTracker::new(Arc::clone(&store), vec![A, B]);
            tracker.observe(A, Some(RawPresence::Online)).await;
            tracker.observe(B, Some(RawPresence::Offline)).await;
        }

        let resumed = PresenceTracker::restore(Arc::clone(&store), vec![A, B]).await;
        assert!(resumed.observe(A, Some(RawPresence::Idle)).await.is_none());
        let t = resumed.observe(B, Some(RawPresence::Online)).await.unwrap();
        assert_eq!(t.kind(), TransitionKind::BecameReachable);
        assert_eq!(t.previous_raw, None);
    }

    #[tokio::test]
    async fn test_concurrent_same_entity_fires_once() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = Arc::new(tracker(&dir));
        tracker.observe(A, Some(RawPresence::Online)).await;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let tracker = Arc::clone(&tracker);
            handles.push(tokio::spawn(async move {
                tracker.observe(A, Some(RawPresence::Offline)).await
            }));
        }

        let mut fired = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
    }

    #[tokio::test]
    async fn test_poll_example_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(&dir);
        let platform = MemoryPlatform::new(UserId::new(99));
        for id in [A, B] {
            platform.add_member(Member {
                id,
                display_name: format!("worker-{id}"),
                is_bot: true,
                is_admin: false,
                roles: Vec::new(),
            });
        }
        platform.set_presence(A, Some(RawPresence::Online));
        platform.set_presence(B, None);

        assert!(tracker.poll(&platform).await.is_empty());
        assert_eq!(
            tracker.snapshot(),
            HashMap::from([(A, StatusClass::Reachable), (B, StatusClass::Unreachable)])
        );

        platform.set_presence(A, None);
        platform.set_presence(B, Some(RawPresence::Online));
        let transitions = tracker.poll(&platform).await;
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0].entity, A);
        assert_eq!(transitions[0].kind(), TransitionKind::BecameUnreachable);
        assert_eq!(transitions[1].entity, B);
        assert_eq!(transitions[1].kind(), TransitionKind::BecameReachable);
    }
}
