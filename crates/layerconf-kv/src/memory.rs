//! Process-local key-value store.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::entry::StoredEntry;
use crate::error::StoreError;
use crate::KvStore;

/// Thread-safe in-memory store with TTL expiry on read.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a store that reads time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Create a store pre-populated with entries that never expire.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        if let Ok(mut map) = store.entries.write() {
            for (key, value) in entries {
                map.insert(
                    key.into(),
                    StoredEntry {
                        value: value.into(),
                        expires_at: None,
                    },
                );
            }
        }
        store
    }

    /// Drop entries whose TTL has elapsed. Returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let mut map = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        let before = map.len();
        map.retain(|_, entry| entry.is_live(now));
        Ok(before - map.len())
    }
}

impl KvStore for MemoryStore {
    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let now = self.clock.now();
        let map = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map
            .iter()
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect())
    }

    fn read_one(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = self.clock.now();
        let map = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    fn write(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let entry = StoredEntry::new(value, ttl, self.clock.now())?;
        let mut map = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        map.insert(key.to_string(), entry);
        Ok(())
    }
}
