use std::sync::Arc;

use replaybox_core::StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Synchronous string-keyed storage.
///
/// Stores are shared across every proxy in the process and give no
/// transactional guarantees: concurrent writers to one key race and the last
/// write wins. Entries never expire.
pub trait Store: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Writes unconditionally, replacing any previous value.
    ///
    /// Fails with [`StoreError::CapacityExceeded`] when the store's ceiling
    /// would be crossed.
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    fn remove(&self, key: &str) -> StoreResult<DeleteStatus>;

    /// Every key currently held, in no particular order.
    fn keys(&self) -> StoreResult<Vec<String>>;

    /// Returns the name of this store for logs.
    fn name(&self) -> &str {
        "store"
    }
}

/// Status of deleting result.
#[derive(Debug, PartialEq, Eq)]
pub enum DeleteStatus {
    /// Record successfully deleted.
    Deleted,
    /// Record already missing.
    Missing,
}

impl<S> Store for Arc<S>
where
    S: Store + ?Sized,
{
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StoreResult<DeleteStatus> {
        (**self).remove(key)
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        (**self).keys()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl Store for Box<dyn Store> {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StoreResult<DeleteStatus> {
        (**self).remove(key)
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        (**self).keys()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Bytes an entry counts against a store's capacity.
///
/// Keys and values both count, the way browser local storage accounts quota.
pub(crate) fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}
