//! Redis session store implementation

use std::time::Duration;

use async_trait::async_trait;
use perch_types::{CredentialId, SubjectId};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::error::{StoreError, StoreResult};
use crate::store::SessionStore;

/// Default key prefix for session entries
pub const DEFAULT_KEY_PREFIX: &str = "perch:session:";

/// Redis session store
///
/// Entries are plain string values written with `PSETEX`, so redis expires
/// them on its own. The connection manager reconnects transparently and is
/// cheap to clone per call.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisSessionStore {
    /// Create a new redis session store
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }

    /// Set the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    fn key(&self, id: CredentialId) -> String {
        entry_key(&self.key_prefix, id)
    }
}

fn entry_key(prefix: &str, id: CredentialId) -> String {
    format!("{prefix}{id}")
}

fn ttl_millis(ttl: Duration) -> StoreResult<u64> {
    if ttl.is_zero() {
        return Err(StoreError::InvalidTtl);
    }
    // PSETEX rejects zero
    let millis = ttl.as_millis().max(1);
    Ok(u64::try_from(millis).unwrap_or(u64::MAX))
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(&self, id: CredentialId, subject: &SubjectId, ttl: Duration) -> StoreResult<()> {
        let millis = ttl_millis(ttl)?;
        let mut conn = self.conn.clone();
        let _: () = conn.pset_ex(self.key(id), subject.as_str(), millis).await?;
        Ok(())
    }

    async fn get(&self, id: CredentialId) -> StoreResult<Option<SubjectId>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(self.key(id)).await?;

        value
            .map(|raw| {
                SubjectId::parse(&raw).map_err(|e| {
                    tracing::error!(credential_id = %id, "Corrupt session entry: {}", e);
                    StoreError::Corrupt(e.to_string())
                })
            })
            .transpose()
    }

    async fn delete(&self, id: CredentialId) -> StoreResult<u64> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn.del(self.key(id)).await?;
        Ok(removed)
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

impl std::fmt::Debug for RedisSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSessionStore")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_key_uses_prefix() {
        let id = CredentialId::new();
        assert_eq!(entry_key("perch:session:", id), format!("perch:session:{id}"));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        assert!(matches!(ttl_millis(Duration::ZERO), Err(StoreError::InvalidTtl)));
    }

    #[test]
    fn test_sub_millisecond_ttl_rounds_up() {
        assert_eq!(ttl_millis(Duration::from_micros(10)).unwrap(), 1);
        assert_eq!(ttl_millis(Duration::from_secs(2)).unwrap(), 2000);
    }
}
