//! In-memory store.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use replaybox_core::StoreError;

use crate::store::{DeleteStatus, Store, StoreResult, entry_size};

/// Default capacity ceiling: 5 MiB, the usual browser local storage quota.
pub const DEFAULT_CAPACITY: usize = 5 * 1024 * 1024;

/// In-memory store with a byte capacity ceiling.
///
/// Backed by a [`DashMap`], so reads and writes to different keys do not
/// contend. Data is lost when the store is dropped; use
/// [`FileStore`](crate::FileStore) when responses must survive restarts.
///
/// ```
/// use replaybox_backend::{MemoryStore, Store};
///
/// let store = MemoryStore::with_capacity(16);
/// store.set("key", "value").unwrap();
/// assert!(store.set("other", "too long for it").is_err());
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
    used: AtomicUsize,
    capacity: Option<usize>,
}

impl MemoryStore {
    /// Creates a store with the [`DEFAULT_CAPACITY`] ceiling.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a store holding at most `capacity` bytes of keys and values.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            used: AtomicUsize::new(0),
            capacity: Some(capacity),
        }
    }

    /// Creates a store without a ceiling.
    pub fn unbounded() -> Self {
        Self {
            entries: DashMap::new(),
            used: AtomicUsize::new(0),
            capacity: None,
        }
    }

    /// Bytes currently held.
    pub fn used_bytes(&self) -> usize {
        self.used.load(Ordering::SeqCst)
    }

    /// Configured ceiling, if any.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn reserve(&self, additional: usize) -> StoreResult<()> {
        let Some(capacity) = self.capacity else {
            self.used.fetch_add(additional, Ordering::SeqCst);
            return Ok(());
        };

        self.used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                let next = used + additional;
                (next <= capacity).then_some(next)
            })
            .map(|_| ())
            .map_err(|used| StoreError::CapacityExceeded {
                requested: used + additional,
                capacity,
            })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.get(key).map(|value| value.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        // The entry guard holds the shard lock, so the size of the value being
        // replaced cannot change underneath the accounting.
        let entry = self.entries.entry(key.to_owned());
        let previous = match &entry {
            Entry::Occupied(occupied) => entry_size(key, occupied.get()),
            Entry::Vacant(_) => 0,
        };
        let next = entry_size(key, value);

        if next > previous {
            self.reserve(next - previous)?;
        } else {
            self.used.fetch_sub(previous - next, Ordering::SeqCst);
        }

        entry.insert(value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<DeleteStatus> {
        match self.entries.remove(key) {
            Some((key, value)) => {
                self.used
                    .fetch_sub(entry_size(&key, &value), Ordering::SeqCst);
                Ok(DeleteStatus::Deleted)
            }
            None => Ok(DeleteStatus::Missing),
        }
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.entries.iter().map(|entry| entry.key().clone()).collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrite_adjusts_usage() {
        let store = MemoryStore::with_capacity(100);
        store.set("k", "aaaa").unwrap();
        assert_eq!(store.used_bytes(), 5);

        store.set("k", "aa").unwrap();
        assert_eq!(store.used_bytes(), 3);
        assert_eq!(store.get("k").unwrap().as_deref(), Some("aa"));
    }

    #[test]
    fn rejected_write_keeps_previous_value() {
        let store = MemoryStore::with_capacity(10);
        store.set("k", "value").unwrap();

        let err = store.set("k", "much longer value").unwrap_err();
        assert!(matches!(
            err,
            StoreError::CapacityExceeded { capacity: 10, .. }
        ));
        assert_eq!(store.get("k").unwrap().as_deref(), Some("value"));
        assert_eq!(store.used_bytes(), 6);
    }

    #[test]
    fn remove_releases_capacity() {
        let store = MemoryStore::with_capacity(8);
        store.set("key", "12345").unwrap();
        assert!(store.set("other", "x").is_err());

        assert_eq!(store.remove("key").unwrap(), DeleteStatus::Deleted);
        assert_eq!(store.remove("key").unwrap(), DeleteStatus::Missing);
        assert_eq!(store.used_bytes(), 0);
        store.set("other", "x").unwrap();
    }

    #[test]
    fn unbounded_store_accepts_anything() {
        let store = MemoryStore::unbounded();
        let big = "x".repeat(DEFAULT_CAPACITY * 2);
        store.set("big", &big).unwrap();
        assert_eq!(store.capacity(), None);
        assert_eq!(store.len(), 1);
    }
}
