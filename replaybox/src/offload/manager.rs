//! OffloadManager implementation for background task execution.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use replaybox_core::CacheKey;
use smol_str::SmolStr;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info_span, warn};

#[cfg(feature = "metrics")]
use crate::metrics::{
    OFFLOAD_TASK_DURATION, OFFLOAD_TASKS_ACTIVE, OFFLOAD_TASKS_COMPLETED,
    OFFLOAD_TASKS_DEDUPLICATED, OFFLOAD_TASKS_SPAWNED,
};

use super::policy::OffloadConfig;

/// Key for identifying offloaded tasks.
///
/// Background work is always a refresh of one cache entry, so the entry's
/// key identifies the task for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OffloadKey(CacheKey);

impl OffloadKey {
    /// Returns the key type for metrics labels and spans.
    pub fn key_type(&self) -> SmolStr {
        SmolStr::new_static("refresh")
    }
}

impl From<CacheKey> for OffloadKey {
    fn from(key: CacheKey) -> Self {
        Self(key)
    }
}

#[derive(Debug)]
struct TrackedTask {
    key: OffloadKey,
    handle: JoinHandle<()>,
}

/// Internal state shared across clones.
#[derive(Debug)]
struct OffloadManagerInner {
    config: OffloadConfig,
    tasks: DashMap<u64, TrackedTask>,
    task_counter: AtomicU64,
}

/// Manager for offloading tasks to background execution.
///
/// Every spawned task is tracked until it finishes, so callers can wait for
/// outstanding background refreshes with [`OffloadManager::wait_all`].
/// Cloning is cheap; clones share the same task set.
#[derive(Clone, Debug)]
pub struct OffloadManager {
    inner: Arc<OffloadManagerInner>,
}

impl OffloadManager {
    /// Create a new OffloadManager with the given configuration.
    pub fn new(config: OffloadConfig) -> Self {
        Self {
            inner: Arc::new(OffloadManagerInner {
                config,
                tasks: DashMap::new(),
                task_counter: AtomicU64::new(0),
            }),
        }
    }

    /// Create a new OffloadManager with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(OffloadConfig::default())
    }

    /// Configuration this manager was built with.
    pub fn config(&self) -> &OffloadConfig {
        &self.inner.config
    }

    /// Spawn a task with a specific key.
    ///
    /// If a task with the same key is already in flight and
    /// deduplication is enabled, the new task is dropped without running.
    ///
    /// Returns `true` if the task was spawned, `false` if it was deduplicated.
    pub fn spawn_with_key<K, F>(&self, key: K, task: F) -> bool
    where
        K: Into<OffloadKey>,
        F: Future<Output = ()> + Send + 'static,
    {
        let key = key.into();

        if self.inner.config.deduplicate && self.is_in_flight(&key) {
            debug!(?key, "Task deduplicated - already in flight");
            #[cfg(feature = "metrics")]
            metrics::counter!(*OFFLOAD_TASKS_DEDUPLICATED, "key_type" => key.key_type().to_string())
                .increment(1);
            return false;
        }

        #[cfg(feature = "metrics")]
        {
            let key_type = key.key_type().to_string();
            metrics::counter!(*OFFLOAD_TASKS_SPAWNED, "key_type" => key_type.clone()).increment(1);
            metrics::gauge!(*OFFLOAD_TASKS_ACTIVE, "key_type" => key_type).increment(1.0);
        }

        let id = self.inner.task_counter.fetch_add(1, Ordering::Relaxed);
        let handle = self.spawn_inner(id, key.clone(), task);
        self.inner.tasks.insert(id, TrackedTask { key, handle });
        true
    }

    /// Get the number of currently active tasks.
    pub fn active_task_count(&self) -> usize {
        self.inner
            .tasks
            .iter()
            .filter(|task| !task.handle.is_finished())
            .count()
    }

    /// Check if a task with the given key is in flight.
    pub fn is_in_flight(&self, key: &OffloadKey) -> bool {
        self.inner
            .tasks
            .iter()
            .any(|task| &task.key == key && !task.handle.is_finished())
    }

    /// Wait for all currently tracked tasks to complete.
    ///
    /// Tasks spawned while waiting are awaited too.
    pub async fn wait_all(&self) {
        loop {
            let ids: Vec<u64> = self.inner.tasks.iter().map(|task| *task.key()).collect();
            if ids.is_empty() {
                break;
            }

            for id in ids {
                let Some((_, task)) = self.inner.tasks.remove(&id) else {
                    continue;
                };
                if let Err(error) = task.handle.await {
                    warn!(key = ?task.key, %error, "Offload task did not complete");
                }
            }
        }
    }

    /// Wait for all tasks with a timeout.
    ///
    /// Returns `true` if all tasks completed within the timeout,
    /// `false` if the timeout was reached. Tasks keep running either way.
    pub async fn wait_all_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_all()).await.is_ok()
    }

    fn spawn_inner<F>(&self, id: u64, key: OffloadKey, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let inner = self.inner.clone();
        let warn_after = self.inner.config.warn_after;
        let span = info_span!(
            "offload_task",
            key_type = %key.key_type(),
            key = ?key,
        );

        tokio::spawn(
            async move {
                let start = Instant::now();
                task.await;
                let elapsed = start.elapsed();

                if let Some(threshold) = warn_after
                    && elapsed > threshold
                {
                    warn!(
                        ?key,
                        elapsed_ms = elapsed.as_millis(),
                        threshold_ms = threshold.as_millis(),
                        "Offload task exceeded timeout threshold"
                    );
                }

                #[cfg(feature = "metrics")]
                {
                    let key_type = key.key_type().to_string();
                    metrics::counter!(*OFFLOAD_TASKS_COMPLETED, "key_type" => key_type.clone())
                        .increment(1);
                    metrics::gauge!(*OFFLOAD_TASKS_ACTIVE, "key_type" => key_type.clone())
                        .decrement(1.0);
                    metrics::histogram!(*OFFLOAD_TASK_DURATION, "key_type" => key_type)
                        .record(elapsed.as_secs_f64());
                }

                inner.tasks.remove(&id);
            }
            .instrument(span),
        )
    }
}

impl Default for OffloadManager {
    fn default() -> Self {
        Self::with_defaults()
    }
}
