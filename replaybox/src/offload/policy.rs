//! Offload task configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the [`OffloadManager`](super::OffloadManager).
///
/// Offloaded tasks are never cancelled: once a refresh has been dispatched it
/// runs to completion under the transport's own timeout behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffloadConfig {
    /// Skip a refresh when one for the same cache key is already in flight.
    #[serde(default)]
    pub deduplicate: bool,
    /// Log a warning when a task runs longer than this (e.g., "30s", "500ms").
    #[serde(default, with = "humantime_serde")]
    pub warn_after: Option<Duration>,
}

impl OffloadConfig {
    /// Create a new builder for OffloadConfig.
    pub fn builder() -> OffloadConfigBuilder {
        OffloadConfigBuilder::default()
    }
}

/// Builder for OffloadConfig.
#[derive(Debug, Clone, Default)]
pub struct OffloadConfigBuilder {
    deduplicate: bool,
    warn_after: Option<Duration>,
}

impl OffloadConfigBuilder {
    /// Enable or disable task deduplication.
    pub fn deduplicate(self, enabled: bool) -> Self {
        Self {
            deduplicate: enabled,
            ..self
        }
    }

    /// Warn about tasks running longer than `duration`.
    pub fn warn_after(self, duration: Duration) -> Self {
        Self {
            warn_after: Some(duration),
            ..self
        }
    }

    /// Build the OffloadConfig.
    pub fn build(self) -> OffloadConfig {
        OffloadConfig {
            deduplicate: self.deduplicate,
            warn_after: self.warn_after,
        }
    }
}
