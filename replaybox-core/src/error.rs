//! Error types shared by transports and stores.

use thiserror::Error;

/// Boxed error used for opaque failures from external collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store refused a write because its size ceiling would be exceeded.
    ///
    /// There is no eviction policy; the caller is expected to clear entries.
    #[error("store capacity exceeded: write needs {requested} bytes, capacity is {capacity} bytes")]
    CapacityExceeded {
        /// Bytes the store would hold after the write.
        requested: usize,
        /// Configured ceiling in bytes.
        capacity: usize,
    },

    /// Reading or writing the storage medium failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Persisted data could not be encoded or decoded.
    #[error("store format error: {0}")]
    Format(#[source] BoxError),

    /// Any other storage failure.
    #[error(transparent)]
    Internal(BoxError),
}

/// Error returned from [`Transport::send`](crate::Transport::send).
#[derive(Debug, Error)]
pub enum RequestError {
    /// `send` was called before `open`.
    #[error("request must be opened before it is sent")]
    NotOpened,

    /// The request could not be built from its identity or headers.
    #[error("invalid request: {0}")]
    InvalidRequest(#[source] BoxError),

    /// The transport failed before a response was produced.
    #[error("network failure: {0}")]
    Network(#[source] BoxError),

    /// The response store rejected an operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RequestError {
    /// Wraps a transport-level failure.
    pub fn network(error: impl Into<BoxError>) -> Self {
        Self::Network(error.into())
    }
}
