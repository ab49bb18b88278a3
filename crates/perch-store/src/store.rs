//! Session store trait
//!
//! Defines the async interface shared by every session store backend.

use std::time::Duration;

use async_trait::async_trait;
use perch_types::{CredentialId, SubjectId};

use crate::error::StoreResult;

/// Session store trait
///
/// Every key is the unique id of exactly one issued credential, so callers
/// never contend on the same key under normal operation.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert or overwrite an entry that expires after `ttl`
    async fn put(&self, id: CredentialId, subject: &SubjectId, ttl: Duration) -> StoreResult<()>;

    /// Look up the subject for a credential.
    ///
    /// `None` covers revoked, expired and never-issued credentials alike.
    async fn get(&self, id: CredentialId) -> StoreResult<Option<SubjectId>>;

    /// Remove an entry, returning how many entries were removed (0 or 1)
    async fn delete(&self, id: CredentialId) -> StoreResult<u64>;

    /// Check connectivity to the backing store
    async fn ping(&self) -> StoreResult<()>;
}
