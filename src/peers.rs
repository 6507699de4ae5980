use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PeerRecord {
    pub content: String, // opaque, caller-defined
    pub last_seen: DateTime<Utc>,
}

/// Point-in-time copy of the registry, owned by the caller.
pub type Snapshot = HashMap<String, PeerRecord>;

pub type PeerStore = Arc<PeerRegistry>;

pub fn new_store() -> PeerStore {
    Arc::new(PeerRegistry::new())
}

/// Last-seen bookkeeping for recently observed peers.
///
/// Every operation takes the single lock for its whole duration, so callers
/// racing on the same identifier are resolved last-writer-wins in lock order.
/// Timestamps are read while the lock is held.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    entries: Mutex<HashMap<String, PeerRecord>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Mutations never leave the map half-updated, so a poisoned lock is still
    // safe to use.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, PeerRecord>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace the record for `id`, stamping it with the current time.
    pub fn upsert(&self, id: impl Into<String>, content: impl Into<String>) {
        let mut entries = self.entries();
        let record = PeerRecord {
            content: content.into(),
            last_seen: Utc::now(),
        };
        entries.insert(id.into(), record);
    }

    /// Refresh `last_seen` for a known peer. Unknown peers are left untracked.
    ///
    /// Returns whether the peer was present.
    pub fn touch(&self, id: &str) -> bool {
        let mut entries = self.entries();
        match entries.get_mut(id) {
            Some(record) => {
                record.last_seen = Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: &str) -> Option<PeerRecord> {
        self.entries().remove(id)
    }

    pub fn get(&self, id: &str) -> Option<PeerRecord> {
        self.entries().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.entries().clone()
    }

    /// Drop every peer last seen strictly before `cutoff` and return their ids.
    ///
    /// A peer seen exactly at `cutoff` is kept. Order of the result is unspecified.
    pub fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Vec<String> {
        let mut entries = self.entries();
        let mut dropped = Vec::new();
        entries.retain(|id, record| {
            if record.last_seen < cutoff {
                dropped.push(id.clone());
                false
            } else {
                true
            }
        });
        dropped
    }
}
