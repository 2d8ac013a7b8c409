//! Offload manager for background task execution.
//!
//! When a response is served from the cache and refresh is enabled, the real
//! request still has to go out so the stored entry stays current. The caller
//! has already been answered, so that request runs here, in the background,
//! where it can be tracked and awaited.
//!
//! # Example
//!
//! ```ignore
//! use replaybox::offload::{OffloadConfig, OffloadManager};
//! use replaybox_core::{CacheKey, RequestIdentity};
//!
//! let manager = OffloadManager::new(OffloadConfig::default());
//! let key = CacheKey::new("ajaxreplay", &RequestIdentity::new("GET", "/users"), None);
//! manager.spawn_with_key(key, async { /* ... */ });
//! manager.wait_all().await;
//! ```

mod manager;
mod policy;

pub use manager::{OffloadKey, OffloadManager};
pub use policy::{OffloadConfig, OffloadConfigBuilder};
