//! Metrics declaration and initialization.

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    // Cache status metrics

    /// Track number of cache hit events.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "replaybox_cache_hit_total",
            "Total number of dispatches answered from the cache."
        );
        "replaybox_cache_hit_total"
    };
    /// Track number of cache miss events.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "replaybox_cache_miss_total",
            "Total number of dispatches that found no cached response."
        );
        "replaybox_cache_miss_total"
    };
    /// Track number of background refreshes issued after a hit.
    pub static ref CACHE_REFRESH_COUNTER: &'static str = {
        metrics::describe_counter!(
            "replaybox_cache_refresh_total",
            "Total number of network refreshes issued after a cache hit."
        );
        "replaybox_cache_refresh_total"
    };
    /// Track number of network completions withheld from the caller.
    pub static ref NOTIFICATION_SUPPRESSED_COUNTER: &'static str = {
        metrics::describe_counter!(
            "replaybox_notification_suppressed_total",
            "Total number of network completions not reported because the cache already answered."
        );
        "replaybox_notification_suppressed_total"
    };
    /// Track cache writes.
    pub static ref CACHE_WRITES: &'static str = {
        metrics::describe_counter!(
            "replaybox_cache_writes_total",
            "Total number of cache writes."
        );
        "replaybox_cache_writes_total"
    };
    /// Track cache write errors.
    pub static ref CACHE_WRITE_ERRORS: &'static str = {
        metrics::describe_counter!(
            "replaybox_cache_write_errors_total",
            "Total number of cache writes rejected by the store."
        );
        "replaybox_cache_write_errors_total"
    };

    // Offload manager metrics

    /// Track number of offload tasks spawned.
    pub static ref OFFLOAD_TASKS_SPAWNED: &'static str = {
        metrics::describe_counter!(
            "replaybox_offload_tasks_spawned_total",
            "Total number of offload tasks spawned."
        );
        "replaybox_offload_tasks_spawned_total"
    };
    /// Track number of offload tasks completed.
    pub static ref OFFLOAD_TASKS_COMPLETED: &'static str = {
        metrics::describe_counter!(
            "replaybox_offload_tasks_completed_total",
            "Total number of offload tasks completed."
        );
        "replaybox_offload_tasks_completed_total"
    };
    /// Track number of offload tasks deduplicated (skipped).
    pub static ref OFFLOAD_TASKS_DEDUPLICATED: &'static str = {
        metrics::describe_counter!(
            "replaybox_offload_tasks_deduplicated_total",
            "Total number of offload tasks skipped because one was already in flight."
        );
        "replaybox_offload_tasks_deduplicated_total"
    };
    /// Gauge of currently active offload tasks.
    pub static ref OFFLOAD_TASKS_ACTIVE: &'static str = {
        metrics::describe_gauge!(
            "replaybox_offload_tasks_active",
            "Number of currently active offload tasks."
        );
        "replaybox_offload_tasks_active"
    };
    /// Histogram of offload task duration.
    pub static ref OFFLOAD_TASK_DURATION: &'static str = {
        metrics::describe_histogram!(
            "replaybox_offload_task_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of offload tasks in seconds."
        );
        "replaybox_offload_task_duration_seconds"
    };
}

/// Record the outcome of a cache read.
///
/// When the `metrics` feature is disabled, this function is a no-op
/// and will be eliminated by the compiler.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_cache_read(hit: bool) {
    let counter = if hit {
        *CACHE_HIT_COUNTER
    } else {
        *CACHE_MISS_COUNTER
    };
    metrics::counter!(counter).increment(1);
}

#[cfg(not(feature = "metrics"))]
#[inline]
#[allow(missing_docs)]
pub fn record_cache_read(_hit: bool) {}

/// Record a refresh issued after a cache hit.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_refresh() {
    metrics::counter!(*CACHE_REFRESH_COUNTER).increment(1);
}

#[cfg(not(feature = "metrics"))]
#[inline]
#[allow(missing_docs)]
pub fn record_refresh() {}

/// Record a network completion withheld from the caller.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_suppressed() {
    metrics::counter!(*NOTIFICATION_SUPPRESSED_COUNTER).increment(1);
}

#[cfg(not(feature = "metrics"))]
#[inline]
#[allow(missing_docs)]
pub fn record_suppressed() {}

/// Record a cache write attempt.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_cache_write(success: bool, store: &str) {
    let counter = if success {
        *CACHE_WRITES
    } else {
        *CACHE_WRITE_ERRORS
    };
    metrics::counter!(counter, "store" => store.to_string()).increment(1);
}

#[cfg(not(feature = "metrics"))]
#[inline]
#[allow(missing_docs)]
pub fn record_cache_write(_success: bool, _store: &str) {}
