//! TTL cache of run results.

use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

use reasoner_core::RunResult;

struct Entry {
    run: RunResult,
    /// Set once the run reaches a terminal status.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Run results keyed by task id.
///
/// Entries never expire while a run is in flight. Once terminal they live
/// for `ttl` and are then treated as absent.
pub struct ResultCache {
    entries: DashMap<String, Entry>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Insert a fresh run. An existing entry with the same id is replaced.
    pub fn insert(&self, run: RunResult) {
        let expires_at = run.status.is_terminal().then(|| Instant::now() + self.ttl);
        self.entries
            .insert(run.task_id.clone(), Entry { run, expires_at });
    }

    /// Apply `change` to a live entry. Returns what `change` returned, or
    /// false when the id is unknown or expired.
    pub fn update(&self, task_id: &str, change: impl FnOnce(&mut RunResult) -> bool) -> bool {
        let Some(mut entry) = self.entries.get_mut(task_id) else {
            return false;
        };
        if entry.is_expired(Instant::now()) {
            return false;
        }
        let changed = change(&mut entry.run);
        if changed && entry.expires_at.is_none() && entry.run.status.is_terminal() {
            entry.expires_at = Some(Instant::now() + self.ttl);
        }
        changed
    }

    /// Snapshot of a live entry. Expired entries are evicted on read.
    pub fn get(&self, task_id: &str) -> Option<RunResult> {
        let now = Instant::now();
        let entry = self.entries.get(task_id)?;
        if !entry.is_expired(now) {
            return Some(entry.run.clone());
        }
        drop(entry);
        self.entries.remove_if(task_id, |_, e| e.is_expired(now));
        None
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
