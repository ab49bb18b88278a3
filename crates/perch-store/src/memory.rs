//! In-process session store backed by a moka cache
//!
//! Suitable for tests and single-instance development. Every server instance
//! has its own cache, so deployments with more than one instance must use
//! [`RedisSessionStore`](crate::RedisSessionStore).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use perch_types::{CredentialId, SubjectId};

use crate::error::{StoreError, StoreResult};
use crate::store::SessionStore;

/// Default maximum number of live entries
pub const DEFAULT_MAX_CAPACITY: u64 = 100_000;

#[derive(Debug, Clone)]
struct Entry {
    subject: SubjectId,
    ttl: Duration,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Per-entry expiry: every insert, including an overwrite, restarts the TTL
struct EntryExpiry;

impl Expiry<CredentialId, Entry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &CredentialId,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &CredentialId,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-memory session store
#[derive(Clone)]
pub struct MemorySessionStore {
    cache: Cache<CredentialId, Entry>,
}

impl MemorySessionStore {
    /// Create a store with the default capacity
    pub fn new() -> Self {
        Self::with_max_capacity(DEFAULT_MAX_CAPACITY)
    }

    /// Create a store holding at most `max_capacity` entries.
    ///
    /// Entries evicted for capacity are indistinguishable from revoked ones.
    pub fn with_max_capacity(max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .expire_after(EntryExpiry)
                .build(),
        }
    }

    /// Number of entries currently held (approximate, includes pending expiry)
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, id: CredentialId, subject: &SubjectId, ttl: Duration) -> StoreResult<()> {
        if ttl.is_zero() {
            return Err(StoreError::InvalidTtl);
        }
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or(StoreError::InvalidTtl)?;
        let entry = Entry {
            subject: subject.clone(),
            ttl,
            expires_at,
        };
        self.cache.insert(id, entry).await;
        Ok(())
    }

    async fn get(&self, id: CredentialId) -> StoreResult<Option<SubjectId>> {
        let now = Instant::now();
        Ok(self
            .cache
            .get(&id)
            .await
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.subject))
    }

    async fn delete(&self, id: CredentialId) -> StoreResult<u64> {
        let now = Instant::now();
        let removed = self.cache.remove(&id).await;
        Ok(match removed {
            Some(entry) if entry.is_live(now) => 1,
            _ => 0,
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

impl std::fmt::Debug for MemorySessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySessionStore")
            .field("entry_count", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> SubjectId {
        SubjectId::from(42u64)
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = MemorySessionStore::new();
        let id = CredentialId::new();

        store.put(id, &subject(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get(id).await.unwrap(), Some(subject()));
    }

    #[tokio::test]
    async fn test_unknown_id_is_absent() {
        let store = MemorySessionStore::new();
        assert_eq!(store.get(CredentialId::new()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemorySessionStore::new();
        let id = CredentialId::new();
        store.put(id, &subject(), Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.delete(id).await.unwrap(), 1);
        assert_eq!(store.delete(id).await.unwrap(), 0);
        assert_eq!(store.get(id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let store = MemorySessionStore::new();
        let id = CredentialId::new();
        store.put(id, &subject(), Duration::from_millis(50)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(store.get(id).await.unwrap(), None);
        assert_eq!(store.delete(id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_subject_and_ttl() {
        let store = MemorySessionStore::new();
        let id = CredentialId::new();
        store.put(id, &subject(), Duration::from_millis(50)).await.unwrap();
        store
            .put(id, &SubjectId::from(7u64), Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(store.get(id).await.unwrap(), Some(SubjectId::from(7u64)));
    }

    #[tokio::test]
    async fn test_zero_ttl_rejected() {
        let store = MemorySessionStore::new();
        let result = store.put(CredentialId::new(), &subject(), Duration::ZERO).await;
        assert!(matches!(result, Err(StoreError::InvalidTtl)));
    }

    #[tokio::test]
    async fn test_unrepresentable_ttl_rejected() {
        let store = MemorySessionStore::new();
        let id = CredentialId::new();

        let result = store.put(id, &subject(), Duration::MAX).await;

        assert!(matches!(result, Err(StoreError::InvalidTtl)));
        assert_eq!(store.get(id).await.unwrap(), None);
    }
}
