//! Rolling count of recent resource creations.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Creation timestamps within a sliding window.
#[derive(Debug)]
pub struct CreationLog {
    /// Window length
    window: Duration,
    /// Creation times, oldest first
    entries: Mutex<VecDeque<DateTime<Utc>>>,
}

impl CreationLog {
    /// Create a log keeping `window_hours` of history. Windows beyond what
    /// chrono can represent are clamped to the largest duration.
    pub fn new(window_hours: u64) -> Self {
        let window = i64::try_from(window_hours)
            .ok()
            .and_then(Duration::try_hours)
            .unwrap_or(Duration::MAX);
        Self {
            window,
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a creation, dropping entries that fell out of the window.
    pub fn record(&self, at: DateTime<Utc>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        self.prune(&mut entries, at);
        entries.push_back(at);
    }

    /// Creations within the window ending at `now`; older entries are dropped.
    pub fn count_recent(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        self.prune(&mut entries, now);
        entries.len()
    }

    fn prune(&self, entries: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>) {
        // A cutoff before the representable range keeps everything.
        let Some(cutoff) = now.checked_sub_signed(self.window) else {
            return;
        };
        while entries.front().is_some_and(|t| *t < cutoff) {
            entries.pop_front();
        }
    }
}
