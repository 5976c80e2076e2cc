use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use super::SessionStore;

/// Saves between sweeps of idle entries.
const SWEEP_EVERY: u64 = 1024;

#[derive(Debug)]
struct Entry {
    data: HashMap<String, String>,
    touched: Instant,
}

/// In-process session store.
///
/// Backed by a sharded `DashMap`, so requests for different tokens rarely
/// contend. State is lost when the process exits.
///
/// With [`MemorySessionStore::with_idle_timeout`] entries not loaded or saved
/// within the timeout are dropped: lazily when their token is presented again,
/// and in a sweep every [`SWEEP_EVERY`] saves.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, Entry>,
    idle_timeout: Option<Duration>,
    saves: AtomicU64,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that forgets sessions idle for longer than `timeout`.
    #[must_use]
    pub fn with_idle_timeout(timeout: Duration) -> Self {
        Self {
            idle_timeout: Some(timeout),
            ..Self::default()
        }
    }

    /// Number of stored sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop every idle entry now. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let Some(timeout) = self.idle_timeout else {
            return 0;
        };
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| entry.touched.elapsed() <= timeout);
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            debug!(removed, remaining = self.sessions.len(), "Purged idle sessions");
        }
        removed
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        self.idle_timeout
            .is_some_and(|timeout| entry.touched.elapsed() > timeout)
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, token: &str) -> HashMap<String, String> {
        let mut entry = match self.sessions.get_mut(token) {
            Some(entry) => entry,
            None => return HashMap::new(),
        };
        if self.is_expired(&entry) {
            drop(entry);
            self.sessions.remove(token);
            return HashMap::new();
        }
        entry.touched = Instant::now();
        entry.data.clone()
    }

    fn save(&self, token: &str, data: HashMap<String, String>) {
        self.sessions.insert(
            token.to_string(),
            Entry {
                data,
                touched: Instant::now(),
            },
        );
        let saves = self.saves.fetch_add(1, Ordering::Relaxed) + 1;
        if saves % SWEEP_EVERY == 0 {
            self.purge_expired();
        }
    }

    fn destroy(&self, token: &str) {
        self.sessions.remove(token);
    }
}
