//! Mock session stores for testing

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use perch_store::{MemorySessionStore, SessionStore, StoreError, StoreResult};
use perch_types::{CredentialId, SubjectId};

/// Store that fails a chosen `put` call and can be taken offline
#[derive(Default, Clone)]
pub struct FlakyStore {
    inner: MemorySessionStore,
    puts: Arc<AtomicUsize>,
    fail_put_at: Arc<AtomicUsize>,
    offline: Arc<AtomicBool>,
    attempted: Arc<Mutex<Vec<CredentialId>>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`th put (1-based) counted from now
    pub fn fail_put(&self, n: usize) {
        let seen = self.puts.load(Ordering::SeqCst);
        self.fail_put_at.store(seen + n, Ordering::SeqCst);
    }

    /// Make every operation fail
    #[allow(dead_code)]
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Ids of every attempted put, in order
    #[allow(dead_code)]
    pub fn attempted_puts(&self) -> Vec<CredentialId> {
        self.attempted.lock().unwrap().clone()
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn put(&self, id: CredentialId, subject: &SubjectId, ttl: Duration) -> StoreResult<()> {
        self.check_online()?;
        self.attempted.lock().unwrap().push(id);
        let call = self.puts.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_put_at.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected put failure".to_string()));
        }
        self.inner.put(id, subject, ttl).await
    }

    async fn get(&self, id: CredentialId) -> StoreResult<Option<SubjectId>> {
        self.check_online()?;
        self.inner.get(id).await
    }

    async fn delete(&self, id: CredentialId) -> StoreResult<u64> {
        self.check_online()?;
        self.inner.delete(id).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check_online()
    }
}

/// Store that remembers the TTL of every put
///
/// Entries never expire on their own; tests inspect the recorded TTLs.
#[derive(Default, Clone)]
pub struct RecordingStore {
    entries: Arc<DashMap<CredentialId, (SubjectId, Duration)>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// TTL recorded for an entry
    #[allow(dead_code)]
    pub fn ttl_of(&self, id: CredentialId) -> Option<Duration> {
        self.entries.get(&id).map(|e| e.1)
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[async_trait]
impl SessionStore for RecordingStore {
    async fn put(&self, id: CredentialId, subject: &SubjectId, ttl: Duration) -> StoreResult<()> {
        if ttl.is_zero() {
            return Err(StoreError::InvalidTtl);
        }
        self.entries.insert(id, (subject.clone(), ttl));
        Ok(())
    }

    async fn get(&self, id: CredentialId) -> StoreResult<Option<SubjectId>> {
        Ok(self.entries.get(&id).map(|e| e.0.clone()))
    }

    async fn delete(&self, id: CredentialId) -> StoreResult<u64> {
        Ok(self.entries.remove(&id).map_or(0, |_| 1))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
