use thiserror::Error;

/// Errors raised by the key-value backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store: backend failure: {0}")]
    Backend(String),

    #[error("store: lock poisoned")]
    Poisoned,
}

impl StoreError {
    #[inline]
    pub fn backend(message: impl Into<String>) -> Self {
        StoreError::Backend(message.into())
    }
}

/// Errors talking to the upstream chain node.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("chain: transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("chain: rpc error: {0}")]
    Rpc(String),

    #[error("chain: malformed response: {0}")]
    Malformed(String),
}

/// A persisted entry that cannot be decoded.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record: invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record: invalid timestamp {0:?}")]
    Timestamp(String),

    #[error("record: invalid block key {0:?}")]
    BlockKey(String),
}

/// Failures while writing the statistics artifact.
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("dump: {0}")]
    Io(#[from] std::io::Error),

    #[error("dump: {0}")]
    Json(#[from] serde_json::Error),

    #[error("dump: {0}")]
    Store(#[from] StoreError),
}

/// Failure resolving a single sighting; the caller skips that hash.
#[derive(Debug, Error)]
pub enum SightingError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Record(#[from] RecordError),
}
