//! Stores and the namespaced response cache for replaybox.
//!
//! If you want to persist replayed responses somewhere new, implement
//! [`Store`]; [`ResponseCache`] takes care of keys and namespacing.
//!
//! | Store | Persistence | Use Case |
//! |-------|-------------|----------|
//! | [`MemoryStore`] | process lifetime | tests, short-lived clients |
//! | [`FileStore`] | JSON document on disk | replaying across runs |
mod cache;
mod file;
mod memory;
mod store;

pub use cache::ResponseCache;
pub use file::{FileStore, FileStoreBuilder};
pub use memory::{DEFAULT_CAPACITY, MemoryStore};
pub use replaybox_core::StoreError;
pub use store::{DeleteStatus, Store, StoreResult};
