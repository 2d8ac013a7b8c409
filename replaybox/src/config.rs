//! Declarative configuration.
//!
//! ```yaml
//! namespace: ajaxreplay
//! no_cache: false
//! refresh_on_hit: true
//! store:
//!   type: File
//!   path: /var/cache/replaybox
//!   capacity: 5242880
//! offload:
//!   deduplicate: true
//!   warn_after: 30s
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use replaybox_backend::{DEFAULT_CAPACITY, FileStore, MemoryStore, Store};
use replaybox_core::DEFAULT_NAMESPACE;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::ConfigError;
use crate::offload::OffloadConfig;

fn default_namespace() -> SmolStr {
    SmolStr::new_static(DEFAULT_NAMESPACE)
}

fn default_refresh_on_hit() -> bool {
    true
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

/// Top-level settings for a [`Replay`](crate::Replay).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Tag prepended to every cache key.
    #[serde(default = "default_namespace")]
    pub namespace: SmolStr,
    /// Bypass the cache entirely: no reads, no writes.
    #[serde(default)]
    pub no_cache: bool,
    /// Refresh cached entries from the network after answering from them.
    #[serde(default = "default_refresh_on_hit")]
    pub refresh_on_hit: bool,
    /// Backing store.
    #[serde(default)]
    pub store: StoreConfig,
    /// Background refresh settings.
    #[serde(default)]
    pub offload: OffloadConfig,
}

impl ReplayConfig {
    /// Parses a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_saphyr::from_str(yaml).map_err(|error| ConfigError::Parse(error.to_string()))
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            no_cache: false,
            refresh_on_hit: true,
            store: StoreConfig::default(),
            offload: OffloadConfig::default(),
        }
    }
}

/// Where cached responses live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StoreConfig {
    /// In-process [`MemoryStore`].
    Memory {
        /// Byte ceiling for keys plus values.
        #[serde(default = "default_capacity")]
        capacity: usize,
    },
    /// JSON-file backed [`FileStore`].
    File {
        /// JSON document, or a directory to place `replaybox.json` in.
        path: PathBuf,
        /// Byte ceiling for keys plus values.
        #[serde(default = "default_capacity")]
        capacity: usize,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Memory {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl StoreConfig {
    /// Opens the configured store.
    pub fn into_store(self) -> Result<Arc<dyn Store>, ConfigError> {
        match self {
            StoreConfig::Memory { capacity } => Ok(Arc::new(MemoryStore::with_capacity(capacity))),
            StoreConfig::File { path, capacity } => {
                let store = FileStore::builder().path(path).capacity(capacity).build()?;
                Ok(Arc::new(store))
            }
        }
    }
}
