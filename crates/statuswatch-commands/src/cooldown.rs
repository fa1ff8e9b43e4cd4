//! Per-user and global command cooldowns.
//!
//! Uses the tokio clock so tests can drive time with `tokio::time::pause`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use statuswatch_core::types::UserId;

use crate::command::Command;

/// What a cooldown applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CooldownKey {
    /// One user's use of one command.
    User(Command, UserId),
    /// Everyone's use of one command.
    Global(Command),
}

/// Expiry times of active cooldowns.
#[derive(Debug, Default)]
pub struct CooldownRegistry {
    /// Key → instant the cooldown ends
    expiries: Mutex<HashMap<CooldownKey, Instant>>,
}

impl CooldownRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Time left on `key`, `None` if it is not cooling down.
    pub fn remaining(&self, key: CooldownKey) -> Option<Duration> {
        let map = self.expiries.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        map.get(&key)
            .filter(|&&until| until > now)
            .map(|&until| until - now)
    }

    /// Start every cooldown in `windows` if none of them is active.
    ///
    /// Check and set happen under one lock, so two concurrent callers can
    /// never both pass. On refusal nothing is started and the first active
    /// key is returned with its remaining time.
    pub fn try_start(
        &self,
        windows: &[(CooldownKey, Duration)],
    ) -> Result<(), (CooldownKey, Duration)> {
        let mut map = self.expiries.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        for (key, _) in windows {
            if let Some(&until) = map.get(key) {
                if until > now {
                    return Err((*key, until - now));
                }
            }
        }

        for &(key, window) in windows {
            if !window.is_zero() {
                map.insert(key, now + window);
            }
        }
        Ok(())
    }

    /// Cancel a cooldown, e.g. when the guarded action failed.
    pub fn release(&self, key: CooldownKey) {
        let mut map = self.expiries.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(&key);
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let mut map = self.expiries.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        let before = map.len();
        map.retain(|_, until| *until > now);
        before - map.len()
    }

    /// Number of tracked entries.
    pub fn len(&self) -> usize {
        self.expiries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether no entries are tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: UserId = UserId::new(7);

    #[tokio::test(start_paused = true)]
    async fn test_remaining_strictly_decreases_then_clears() {
        let registry = CooldownRegistry::new();
        let key = CooldownKey::User(Command::QueryStatus, USER);
        registry.try_start(&[(key, Duration::from_secs(30))]).unwrap();

        let mut last = registry.remaining(key).unwrap();
        for _ in 0..5 {
            tokio::time::advance(Duration::from_secs(5)).await;
            let now = registry.remaining(key).unwrap();
            assert!(now < last);
            last = now;
        }

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(registry.remaining(key), None);
        assert!(registry.try_start(&[(key, Duration::from_secs(30))]).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_start_is_all_or_nothing() {
        let registry = CooldownRegistry::new();
        let global = CooldownKey::Global(Command::RequestRestart);
        let user = CooldownKey::User(Command::RequestRestart, USER);
        registry.try_start(&[(global, Duration::from_secs(300))]).unwrap();

        let (blocked, _) = registry
            .try_start(&[(global, Duration::from_secs(300)), (user, Duration::from_secs(900))])
            .unwrap_err();
        assert_eq!(blocked, global);
        assert_eq!(registry.remaining(user), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_and_prune() {
        let registry = CooldownRegistry::new();
        let a = CooldownKey::User(Command::EnsureResource, USER);
        let b = CooldownKey::Global(Command::RequestRestart);
        registry
            .try_start(&[(a, Duration::from_secs(10)), (b, Duration::from_secs(100))])
            .unwrap();

        registry.release(b);
        assert_eq!(registry.remaining(b), None);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(registry.prune(), 1);
        assert!(registry.is_empty());
    }
}
