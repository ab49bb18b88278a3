//! Authoritative identity resolution
//!
//! The session store is the only source of truth for "who is this": a
//! credential that verifies but has no store entry is treated as
//! unauthenticated.

use std::sync::Arc;

use perch_store::SessionStore;
use perch_types::{CredentialId, SubjectId};
use tracing::instrument;

use crate::resolver::AdmittedSession;
use crate::AuthError;

/// Resolves a credential's unique id to its live subject
pub struct IdentityResolver<S: ?Sized> {
    store: Arc<S>,
}

impl<S: SessionStore + ?Sized> IdentityResolver<S> {
    /// Create a resolver over a shared session store
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Look up the subject for a credential id
    #[instrument(skip_all, fields(credential_id = %id))]
    pub async fn resolve(&self, id: CredentialId) -> Result<SubjectId, AuthError> {
        match self.store.get(id).await? {
            Some(subject) => Ok(subject),
            None => {
                tracing::debug!("Credential not live in session store");
                Err(AuthError::Unauthorized)
            }
        }
    }

    /// Resolve an admitted session, requiring the store to agree with the
    /// decoded subject claim
    pub async fn resolve_session(&self, session: &AdmittedSession) -> Result<SubjectId, AuthError> {
        let subject = self.resolve(session.credential_id).await?;
        if subject != session.subject_claim {
            tracing::warn!(
                credential_id = %session.credential_id,
                "Session store subject differs from credential claim"
            );
            return Err(AuthError::Unauthorized);
        }
        Ok(subject)
    }
}

impl<S: ?Sized> Clone for IdentityResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ?Sized> std::fmt::Debug for IdentityResolver<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use perch_store::MemorySessionStore;
    use perch_types::TokenKind;
    use std::time::Duration;

    #[tokio::test]
    async fn test_resolve_live_entry() {
        let store = Arc::new(MemorySessionStore::new());
        let id = CredentialId::new();
        store
            .put(id, &SubjectId::from(3u64), Duration::from_secs(60))
            .await
            .unwrap();

        let identity = IdentityResolver::new(store);
        assert_eq!(identity.resolve(id).await.unwrap(), SubjectId::from(3u64));
    }

    #[tokio::test]
    async fn test_absent_entry_is_unauthorized() {
        let identity = IdentityResolver::new(Arc::new(MemorySessionStore::new()));
        assert!(matches!(
            identity.resolve(CredentialId::new()).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_subject_mismatch_is_unauthorized() {
        let store = Arc::new(MemorySessionStore::new());
        let id = CredentialId::new();
        store
            .put(id, &SubjectId::from(3u64), Duration::from_secs(60))
            .await
            .unwrap();

        let session = AdmittedSession {
            credential_id: id,
            kind: TokenKind::Access,
            subject_claim: SubjectId::from(4u64),
            expires_at: Utc::now(),
            pair: None,
        };
        let identity = IdentityResolver::new(store);
        assert!(matches!(
            identity.resolve_session(&session).await,
            Err(AuthError::Unauthorized)
        ));
    }
}
