//! Auth service - ties together issuance, verification, identity and revocation

use std::sync::Arc;

use perch_store::SessionStore;
use perch_types::{CredentialId, SubjectId, TokenKind};
use tracing::instrument;

use crate::{
    codec::CredentialCodec,
    config::AuthConfig,
    identity::IdentityResolver,
    issuer::{IssuedPair, TokenIssuer},
    resolver::{AdmittedSession, SessionResolver},
    revocation::{Revocation, RevocationService},
    AuthError,
};

/// Authentication service
///
/// Provides a unified interface for:
/// - Login (credential pair issuance)
/// - Per-request credential verification
/// - Authoritative identity resolution
/// - Logout and refresh rotation
pub struct AuthService<S: ?Sized> {
    config: AuthConfig,
    codec: Arc<CredentialCodec>,
    resolver: SessionResolver,
    identity: IdentityResolver<S>,
    issuer: TokenIssuer<S>,
    revocation: RevocationService<S>,
    store: Arc<S>,
}

impl<S: SessionStore + ?Sized> AuthService<S> {
    /// Create a new auth service
    pub fn new(config: AuthConfig, store: Arc<S>) -> Result<Self, AuthError> {
        config.validate()?;

        let codec = Arc::new(CredentialCodec::new(
            &config.access_secret,
            &config.refresh_secret,
        )?);
        let resolver = SessionResolver::new(Arc::clone(&codec));

        Ok(Self {
            identity: IdentityResolver::new(Arc::clone(&store)),
            issuer: TokenIssuer::new(
                Arc::clone(&codec),
                Arc::clone(&store),
                config.access_ttl,
                config.refresh_ttl,
            ),
            revocation: RevocationService::new(
                resolver.clone(),
                Arc::clone(&store),
                config.revoke_refresh_on_logout,
            ),
            resolver,
            codec,
            store,
            config,
        })
    }

    // =========================================================================
    // Issuance
    // =========================================================================

    /// Issue a credential pair for a subject whose password was already checked
    pub async fn login(&self, subject: &SubjectId) -> Result<IssuedPair, AuthError> {
        self.issuer.login(subject).await
    }

    /// Exchange a refresh credential for a new pair
    ///
    /// The refresh entry is consumed: a second exchange with the same
    /// credential fails with `Unauthorized`.
    #[instrument(skip_all)]
    pub async fn refresh(&self, presented: &str) -> Result<IssuedPair, AuthError> {
        let session = self
            .resolver
            .admit_kind(Some(presented), TokenKind::Refresh)?;
        let subject = self.identity.resolve_session(&session).await?;

        if self.store.delete(session.credential_id).await? == 0 {
            tracing::debug!(
                credential_id = %session.credential_id,
                "Refresh credential consumed concurrently"
            );
            return Err(AuthError::Unauthorized);
        }

        self.issuer.login(&subject).await
    }

    // =========================================================================
    // Verification
    // =========================================================================

    /// Verify an `Authorization` header value (stateless)
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<AdmittedSession, AuthError> {
        self.resolver.admit_authorization(authorization)
    }

    /// Resolve the live subject for a credential id
    pub async fn resolve(&self, id: CredentialId) -> Result<SubjectId, AuthError> {
        self.identity.resolve(id).await
    }

    // =========================================================================
    // Revocation
    // =========================================================================

    /// Revoke the presented access credential
    pub async fn logout(&self, presented: &str) -> Result<Revocation, AuthError> {
        self.revocation.logout(presented).await
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Stateless gate for middleware
    pub fn resolver(&self) -> SessionResolver {
        self.resolver.clone()
    }

    /// Identity resolver sharing this service's store
    pub fn identity(&self) -> IdentityResolver<S> {
        self.identity.clone()
    }

    /// Shared credential codec
    pub fn codec(&self) -> Arc<CredentialCodec> {
        Arc::clone(&self.codec)
    }

    /// Check session store connectivity
    pub async fn ping_store(&self) -> Result<(), AuthError> {
        self.store.ping().await?;
        Ok(())
    }

    /// Service configuration
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

impl<S: ?Sized> std::fmt::Debug for AuthService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perch_store::MemorySessionStore;

    fn service() -> AuthService<MemorySessionStore> {
        let config = AuthConfig::try_new("a".repeat(32), "r".repeat(32)).unwrap();
        AuthService::new(config, Arc::new(MemorySessionStore::new())).unwrap()
    }

    #[tokio::test]
    async fn test_refresh_rotates_pair() {
        let auth = service();
        let subject = SubjectId::from(8u64);
        let first = auth.login(&subject).await.unwrap();

        let second = auth.refresh(&first.refresh.token).await.unwrap();

        assert_ne!(second.refresh.claims.uid, first.refresh.claims.uid);
        assert_eq!(auth.resolve(second.access.claims.uid).await.unwrap(), subject);
        assert!(matches!(
            auth.resolve(first.refresh.claims.uid).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_refresh_is_single_use() {
        let auth = service();
        let pair = auth.login(&SubjectId::from(8u64)).await.unwrap();

        auth.refresh(&pair.refresh.token).await.unwrap();
        assert!(matches!(
            auth.refresh(&pair.refresh.token).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_refresh_with_access_credential_is_wrong_kind() {
        let auth = service();
        let pair = auth.login(&SubjectId::from(8u64)).await.unwrap();
        assert!(matches!(
            auth.refresh(&pair.access.token).await,
            Err(AuthError::WrongKind)
        ));
    }

    #[tokio::test]
    async fn test_refresh_after_logout_fails() {
        let auth = service();
        let pair = auth.login(&SubjectId::from(8u64)).await.unwrap();

        auth.logout(&pair.access.token).await.unwrap();

        assert!(matches!(
            auth.refresh(&pair.refresh.token).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_authenticate_header() {
        let auth = service();
        let pair = auth.login(&SubjectId::from(8u64)).await.unwrap();
        let header = format!("Bearer {}", pair.access.token);

        let session = auth.authenticate(Some(&header)).unwrap();
        assert_eq!(session.credential_id, pair.access.claims.uid);
        assert!(matches!(auth.authenticate(None), Err(AuthError::Unauthorized)));
    }
}
