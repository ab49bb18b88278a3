//! Perch Store - Session store abstractions
//!
//! TTL-based key-value storage mapping a credential's unique id to the
//! subject it was issued for. The store is the authoritative source of
//! "is this credential still live".
//!
//! # Example
//!
//! ```rust,ignore
//! use perch_store::{connect, SessionStore};
//!
//! let store = connect("redis://127.0.0.1:6379").await?;
//! store.put(credential_id, &subject, Duration::from_secs(900)).await?;
//! let live = store.get(credential_id).await?;
//! ```

pub mod error;
pub mod memory;
pub mod pool;
pub mod redis_store;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemorySessionStore;
pub use pool::{connect, normalize_dsn};
pub use redis_store::RedisSessionStore;
pub use store::*;
