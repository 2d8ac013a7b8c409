#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Declarative configuration.
///
/// [`ReplayConfig`] mirrors every builder setting and can be read from YAML;
/// [`StoreConfig`](config::StoreConfig) selects and opens the backing store.
pub mod config;

/// Error types for building a replay.
pub mod error;

/// Metrics collection for cache observability.
///
/// When the `metrics` feature is enabled, this module provides counters
/// and gauges for:
/// - Cache hits, misses and refreshes
/// - Network completions withheld from callers
/// - Cache writes and rejected writes
/// - Background task lifecycle
pub mod metrics;

/// Background execution of cache refreshes.
pub mod offload;

/// The caching stand-in for a real transport.
pub mod proxy;

mod replay;

pub use config::{ReplayConfig, StoreConfig};
pub use error::ConfigError;
pub use proxy::{DispatchState, RequestProxy};
pub use replay::{Replay, ReplayBuilder};

pub use replaybox_backend::{FileStore, MemoryStore, ResponseCache, Store};
pub use replaybox_core::{
    CacheKey, Credentials, Header, ReadyState, ReadyStateChange, ReadyStateHandler, RequestError,
    RequestIdentity, StoreError, Transport, TransportFactory,
};
