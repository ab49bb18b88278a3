//! Session store errors

use thiserror::Error;

/// Session store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Redis error
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Entries must carry a positive time-to-live
    #[error("invalid ttl: must be greater than zero")]
    InvalidTtl,

    /// Stored value could not be decoded
    #[error("corrupt session entry: {0}")]
    Corrupt(String),

    /// Store is not reachable
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
