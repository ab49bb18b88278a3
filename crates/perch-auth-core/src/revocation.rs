//! Logout and revocation
//!
//! Revocation deletes the session entry for a credential. Once the entry is
//! gone the credential is unusable on any path that resolves identity, no
//! matter how long its signature stays valid.

use std::sync::Arc;

use perch_store::SessionStore;
use tracing::instrument;

use crate::resolver::SessionResolver;
use crate::AuthError;

/// Outcome of a logout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revocation {
    /// The access entry was live and has been removed
    Revoked,
    /// No live entry existed (already logged out or expired in the store)
    AlreadyRevoked,
}

impl Revocation {
    /// Label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Revoked => "revoked",
            Self::AlreadyRevoked => "already_revoked",
        }
    }
}

/// Revokes presented access credentials
pub struct RevocationService<S: ?Sized> {
    resolver: SessionResolver,
    store: Arc<S>,
    revoke_pair: bool,
}

impl<S: SessionStore + ?Sized> RevocationService<S> {
    /// Create a revocation service
    ///
    /// With `revoke_pair` set, logout also deletes the entry of the refresh
    /// credential issued alongside the presented access credential.
    pub fn new(resolver: SessionResolver, store: Arc<S>, revoke_pair: bool) -> Self {
        Self {
            resolver,
            store,
            revoke_pair,
        }
    }

    /// Revoke the presented access credential
    ///
    /// Malformed, forged, expired and refresh credentials are rejected before
    /// the store is touched. The refresh entry is removed first so that a
    /// failure there leaves the access credential live and the logout can be
    /// retried.
    #[instrument(skip_all)]
    pub async fn logout(&self, presented: &str) -> Result<Revocation, AuthError> {
        let session = self.resolver.admit(Some(presented))?;

        if self.revoke_pair {
            if let Some(refresh_id) = session.pair {
                let removed = self.store.delete(refresh_id).await?;
                tracing::debug!(
                    credential_id = %refresh_id,
                    removed,
                    "Revoked paired refresh credential"
                );
            }
        }

        let removed = self.store.delete(session.credential_id).await?;
        let outcome = if removed == 0 {
            Revocation::AlreadyRevoked
        } else {
            Revocation::Revoked
        };

        tracing::info!(
            credential_id = %session.credential_id,
            outcome = outcome.as_str(),
            "Logout processed"
        );
        Ok(outcome)
    }
}

impl<S: ?Sized> Clone for RevocationService<S> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
            store: Arc::clone(&self.store),
            revoke_pair: self.revoke_pair,
        }
    }
}

impl<S: ?Sized> std::fmt::Debug for RevocationService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevocationService")
            .field("revoke_pair", &self.revoke_pair)
            .finish_non_exhaustive()
    }
}
