//! Token issuance
//!
//! Mints an access/refresh pair and records one session entry per
//! credential. Either both entries become live or neither does.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use perch_store::SessionStore;
use perch_types::{SubjectId, TokenKind, TokenPair};
use tracing::instrument;

use crate::codec::{Credential, CredentialCodec};
use crate::AuthError;

/// Access and refresh credentials minted together
#[derive(Debug, Clone)]
pub struct IssuedPair {
    pub access: Credential,
    pub refresh: Credential,
}

impl IssuedPair {
    /// Encoded tokens for the client
    pub fn tokens(&self) -> TokenPair {
        TokenPair {
            access_token: self.access.token.clone(),
            refresh_token: self.refresh.token.clone(),
        }
    }
}

impl From<IssuedPair> for TokenPair {
    fn from(pair: IssuedPair) -> Self {
        Self {
            access_token: pair.access.token,
            refresh_token: pair.refresh.token,
        }
    }
}

/// Issues credential pairs and records them in the session store
pub struct TokenIssuer<S: ?Sized> {
    codec: Arc<CredentialCodec>,
    store: Arc<S>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl<S: SessionStore + ?Sized> TokenIssuer<S> {
    /// Create a new token issuer
    pub fn new(
        codec: Arc<CredentialCodec>,
        store: Arc<S>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            codec,
            store,
            access_ttl,
            refresh_ttl,
        }
    }

    /// Mint a pair for an already-authenticated subject
    ///
    /// The password check belongs to the caller. A store failure fails the
    /// whole login; if the refresh entry cannot be written the access entry is
    /// removed again.
    #[instrument(skip_all, fields(subject = %subject))]
    pub async fn login(&self, subject: &SubjectId) -> Result<IssuedPair, AuthError> {
        let now = Utc::now();
        let refresh = self
            .codec
            .issue_at(subject, TokenKind::Refresh, self.refresh_ttl, now)?;
        let access = self
            .codec
            .issue_paired_access(subject, self.access_ttl, refresh.claims.uid, now)?;

        self.record(&access).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to record access credential");
            e
        })?;

        if let Err(e) = self.record(&refresh).await {
            tracing::error!(error = %e, "Failed to record refresh credential, rolling back");
            if let Err(rollback) = self.store.delete(access.claims.uid).await {
                tracing::warn!(
                    credential_id = %access.claims.uid,
                    error = %rollback,
                    "Rollback of access credential failed; entry lives until its TTL"
                );
            }
            return Err(e);
        }

        tracing::debug!(
            access_id = %access.claims.uid,
            refresh_id = %refresh.claims.uid,
            "Issued credential pair"
        );
        Ok(IssuedPair { access, refresh })
    }

    /// Store one credential with a TTL no longer than its remaining lifetime
    async fn record(&self, credential: &Credential) -> Result<(), AuthError> {
        let ttl = credential.claims.remaining_at(Utc::now());
        if ttl.is_zero() {
            return Err(AuthError::Internal(
                "credential expired before it could be recorded".to_string(),
            ));
        }
        self.store
            .put(credential.claims.uid, &credential.claims.sub, ttl)
            .await?;
        Ok(())
    }
}

impl<S: ?Sized> Clone for TokenIssuer<S> {
    fn clone(&self) -> Self {
        Self {
            codec: Arc::clone(&self.codec),
            store: Arc::clone(&self.store),
            access_ttl: self.access_ttl,
            refresh_ttl: self.refresh_ttl,
        }
    }
}

impl<S: ?Sized> std::fmt::Debug for TokenIssuer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}
