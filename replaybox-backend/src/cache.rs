//! Namespaced response cache over a [`Store`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use replaybox_core::{CacheKey, DEFAULT_NAMESPACE, RequestIdentity};
use smol_str::SmolStr;
use tracing::debug;

use crate::store::{DeleteStatus, Store, StoreResult};

/// Response bodies keyed by request identity.
///
/// Every key written through the cache starts with its namespace tag, which
/// lets [`ResponseCache::clear_all`] remove exactly the entries this cache
/// created while leaving unrelated entries in a shared store alone.
///
/// The enabled flag is a bypass switch: disabling the cache tells callers not
/// to consult or update it, but existing entries stay where they are.
///
/// ```
/// use std::sync::Arc;
/// use replaybox_backend::{MemoryStore, ResponseCache};
/// use replaybox_core::RequestIdentity;
///
/// let cache = ResponseCache::new(Arc::new(MemoryStore::new()));
/// let key = cache.key(&RequestIdentity::new("GET", "/users"), None);
///
/// cache.set(&key, "[1,2,3]").unwrap();
/// assert_eq!(cache.get(&key).unwrap().as_deref(), Some("[1,2,3]"));
/// ```
pub struct ResponseCache {
    store: Arc<dyn Store>,
    namespace: SmolStr,
    enabled: AtomicBool,
}

impl ResponseCache {
    /// Creates an enabled cache under the default namespace.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            namespace: SmolStr::new_static(DEFAULT_NAMESPACE),
            enabled: AtomicBool::new(true),
        }
    }

    /// Replaces the namespace tag.
    pub fn with_namespace(self, namespace: impl Into<SmolStr>) -> Self {
        Self {
            namespace: namespace.into(),
            ..self
        }
    }

    /// Namespace tag prepended to every key.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Underlying store.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Derives the key for a request and body in this cache's namespace.
    pub fn key(&self, request: &RequestIdentity, body: Option<&str>) -> CacheKey {
        CacheKey::new(&self.namespace, request, body)
    }

    pub fn get(&self, key: &CacheKey) -> StoreResult<Option<String>> {
        let value = self.store.get(key.as_str())?;
        debug!(%key, hit = value.is_some(), store = self.store.name(), "cache read");
        Ok(value)
    }

    /// Writes unconditionally. Store errors, including capacity errors, are
    /// returned as-is.
    pub fn set(&self, key: &CacheKey, body: &str) -> StoreResult<()> {
        self.store.set(key.as_str(), body)?;
        debug!(%key, bytes = body.len(), store = self.store.name(), "cache write");
        Ok(())
    }

    /// Removes every entry carrying this cache's namespace tag.
    ///
    /// Returns the number of entries removed.
    pub fn clear_all(&self) -> StoreResult<usize> {
        let mut removed = 0;
        for key in self.store.keys()? {
            if !key.starts_with(self.namespace.as_str()) {
                continue;
            }
            if self.store.remove(&key)? == DeleteStatus::Deleted {
                removed += 1;
            }
        }
        debug!(namespace = %self.namespace, removed, "cache cleared");
        Ok(removed)
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("store", &self.store.name())
            .field("namespace", &self.namespace)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
