use replaybox_core::StoreError;

/// Errors raised while turning configuration into a running [`Replay`](crate::Replay).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The YAML document could not be parsed.
    #[error("invalid replay configuration: {0}")]
    Parse(String),
    /// The configured store could not be opened.
    #[error("failed to open store: {0}")]
    Store(#[from] StoreError),
}
