//! Durable store persisted as a JSON document.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use replaybox_core::StoreError;
use tracing::debug;

use crate::memory::DEFAULT_CAPACITY;
use crate::store::{DeleteStatus, Store, StoreResult, entry_size};

const DEFAULT_FILE_NAME: &str = "replaybox.json";

#[derive(Debug, Default)]
struct FileState {
    entries: BTreeMap<String, String>,
    used: usize,
}

/// Disk-backed store.
///
/// Use this when recorded responses must survive restarts, e.g. to replay a
/// test suite without the network. Every mutation rewrites the whole document
/// to a temporary file and renames it over the original, so a crash never
/// leaves a half-written store behind.
///
/// ```no_run
/// use replaybox_backend::FileStore;
///
/// let store = FileStore::builder()
///     .path("/var/cache/myapp")
///     .capacity(10 * 1024 * 1024)
///     .build()?;
/// # Ok::<(), replaybox_core::StoreError>(())
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    capacity: Option<usize>,
    state: Mutex<FileState>,
}

impl FileStore {
    /// Starts building a new store.
    pub fn builder() -> FileStoreBuilder {
        FileStoreBuilder::default()
    }

    /// Opens (or creates) a store at `path` with the default capacity.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::builder().path(path).build()
    }

    /// Location of the persisted document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes currently held.
    pub fn used_bytes(&self) -> usize {
        self.lock().used
    }

    fn lock(&self) -> MutexGuard<'_, FileState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> StoreResult<()> {
        let encoded =
            serde_json::to_vec(entries).map_err(|err| StoreError::Format(Box::new(err)))?;
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, encoded)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

/// Builder for [`FileStore`].
#[derive(Debug)]
pub struct FileStoreBuilder {
    path: Option<PathBuf>,
    capacity: Option<usize>,
}

impl Default for FileStoreBuilder {
    fn default() -> Self {
        Self {
            path: None,
            capacity: Some(DEFAULT_CAPACITY),
        }
    }
}

impl FileStoreBuilder {
    /// Where to persist the store.
    ///
    /// If path is a directory, creates `replaybox.json` inside it.
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Caps keys plus values at `bytes`.
    ///
    /// Default: 5 MiB
    pub fn capacity(mut self, bytes: usize) -> Self {
        self.capacity = Some(bytes);
        self
    }

    /// Removes the capacity ceiling.
    pub fn unbounded(mut self) -> Self {
        self.capacity = None;
        self
    }

    /// Opens the store, loading any previously persisted entries.
    ///
    /// Fails if the document exists but can't be read or parsed.
    pub fn build(self) -> StoreResult<FileStore> {
        let mut path = self
            .path
            .ok_or_else(|| StoreError::Internal("file store path not specified".into()))?;
        if path.is_dir() {
            path.push(DEFAULT_FILE_NAME);
        }

        let entries: BTreeMap<String, String> = match fs::read(&path) {
            Ok(raw) => {
                serde_json::from_slice(&raw).map_err(|err| StoreError::Format(Box::new(err)))?
            }
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        let used = entries
            .iter()
            .map(|(key, value)| entry_size(key, value))
            .sum();
        debug!(path = %path.display(), entries = entries.len(), used, "file store opened");

        Ok(FileStore {
            path,
            capacity: self.capacity,
            state: Mutex::new(FileState { entries, used }),
        })
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.lock().entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut state = self.lock();
        let previous_size = state
            .entries
            .get(key)
            .map_or(0, |previous| entry_size(key, previous));
        let used = state.used - previous_size + entry_size(key, value);

        if let Some(capacity) = self.capacity
            && used > capacity
        {
            return Err(StoreError::CapacityExceeded {
                requested: used,
                capacity,
            });
        }

        let previous = state.entries.insert(key.to_owned(), value.to_owned());
        if let Err(err) = self.persist(&state.entries) {
            match previous {
                Some(previous) => state.entries.insert(key.to_owned(), previous),
                None => state.entries.remove(key),
            };
            return Err(err);
        }
        state.used = used;
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<DeleteStatus> {
        let mut state = self.lock();
        let Some(previous) = state.entries.remove(key) else {
            return Ok(DeleteStatus::Missing);
        };

        if let Err(err) = self.persist(&state.entries) {
            state.entries.insert(key.to_owned(), previous);
            return Err(err);
        }
        state.used -= entry_size(key, &previous);
        Ok(DeleteStatus::Deleted)
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.lock().entries.keys().cloned().collect())
    }

    fn name(&self) -> &str {
        "file"
    }
}
