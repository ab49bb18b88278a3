//! Per-request session gate
//!
//! Verifies the presented credential statelessly and admits it only if it is
//! of the expected kind. The session store is never consulted here; callers
//! that need an authoritative identity go through
//! [`IdentityResolver`](crate::IdentityResolver).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use perch_types::{CredentialId, SubjectId, TokenKind};

use crate::codec::{CredentialClaims, CredentialCodec};
use crate::AuthError;

/// A credential that passed signature, expiry and kind checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmittedSession {
    /// Unique id of the presented credential
    pub credential_id: CredentialId,
    /// Kind of the presented credential
    pub kind: TokenKind,
    /// Subject decoded from the credential. Not authoritative: it may belong
    /// to a revoked session.
    pub subject_claim: SubjectId,
    /// Expiry of the presented credential
    pub expires_at: DateTime<Utc>,
    /// Paired refresh credential, if the credential carries one
    pub pair: Option<CredentialId>,
}

impl From<CredentialClaims> for AdmittedSession {
    fn from(claims: CredentialClaims) -> Self {
        let expires_at = claims.expires_at();
        Self {
            credential_id: claims.uid,
            kind: claims.kind,
            subject_claim: claims.sub,
            expires_at,
            pair: claims.pair,
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
///
/// The scheme is matched case-insensitively. Returns `None` for other schemes
/// and for an empty token.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Stateless credential gate
#[derive(Debug, Clone)]
pub struct SessionResolver {
    codec: Arc<CredentialCodec>,
}

impl SessionResolver {
    /// Create a resolver over a shared codec
    pub fn new(codec: Arc<CredentialCodec>) -> Self {
        Self { codec }
    }

    /// Admit an access credential
    pub fn admit(&self, credential: Option<&str>) -> Result<AdmittedSession, AuthError> {
        self.admit_kind(credential, TokenKind::Access)
    }

    /// Admit a credential of the expected kind
    ///
    /// - no credential: `Unauthorized`
    /// - undecodable, forged or expired: the codec's error
    /// - valid but of the other kind: `WrongKind`
    pub fn admit_kind(
        &self,
        credential: Option<&str>,
        expected: TokenKind,
    ) -> Result<AdmittedSession, AuthError> {
        let raw = credential.ok_or_else(|| {
            tracing::debug!("No credential presented");
            AuthError::Unauthorized
        })?;

        let claims = self.codec.verify(raw).map_err(|e| {
            tracing::debug!(error = %e, "Credential rejected");
            e
        })?;

        if claims.kind != expected {
            tracing::debug!(
                expected = %expected,
                presented = %claims.kind,
                credential_id = %claims.uid,
                "Credential of wrong kind"
            );
            return Err(AuthError::WrongKind);
        }

        Ok(AdmittedSession::from(claims))
    }

    /// Admit an access credential from a raw `Authorization` header value
    pub fn admit_authorization(
        &self,
        header_value: Option<&str>,
    ) -> Result<AdmittedSession, AuthError> {
        self.admit(header_value.and_then(bearer_token))
    }
}
