//! Store errors.

use std::io;

/// Errors from key-value store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("store document is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TTL out of range: {0:?}")]
    InvalidTtl(std::time::Duration),

    #[error("store lock poisoned")]
    Poisoned,
}
