//! Axum extractors for session authentication.
//!
//! # Usage
//!
//! ```ignore
//! use perch_axum::{LiveIdentity, RequireSession, MaybeSession};
//!
//! // Verified credential (401 if the layer admitted nothing)
//! async fn session_info(session: RequireSession) -> String {
//!     format!("expires at {}", session.expires_at)
//! }
//!
//! // Authoritative subject (401 if the credential was revoked)
//! async fn create_post(identity: LiveIdentity) -> String {
//!     format!("posted as {}", identity.subject)
//! }
//! ```

use std::ops::Deref;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header;
use axum::http::request::Parts;
use perch_auth_core::{bearer_token, IdentityResolver};
use perch_store::SessionStore;
use perch_types::SubjectId;

use crate::context::{SessionContext, SessionContextExt};
use crate::error::SessionRejection;

/// Extractor that requires a session admitted by [`SessionLayer`](crate::SessionLayer).
///
/// Returns 401 if no session context is present.
#[derive(Debug, Clone)]
pub struct RequireSession(pub SessionContext);

impl Deref for RequireSession {
    type Target = SessionContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for RequireSession
where
    S: Send + Sync,
{
    type Rejection = SessionRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionContextExt>()
            .cloned()
            .map(|ext| Self(ext.0))
            .ok_or_else(SessionRejection::unauthorized)
    }
}

/// Extractor for an optional session.
///
/// Returns `None` if the layer admitted nothing, rather than failing.
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<SessionContext>);

impl Deref for MaybeSession {
    type Target = Option<SessionContext>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for MaybeSession
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<SessionContextExt>()
            .cloned()
            .map(|ext| ext.0);
        Ok(Self(session))
    }
}

/// Subject resolved from the session store.
///
/// This is the only source of identity handlers should trust: a credential
/// whose session entry was revoked or expired is refused with 401 even though
/// its signature is still valid.
#[derive(Debug, Clone)]
pub struct LiveIdentity {
    /// Subject the session entry belongs to.
    pub subject: SubjectId,
    /// Verified credential details.
    pub session: SessionContext,
}

impl<S> FromRequestParts<S> for LiveIdentity
where
    IdentityResolver<dyn SessionStore>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = SessionRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireSession(session) = RequireSession::from_request_parts(parts, state).await?;
        let resolver = IdentityResolver::<dyn SessionStore>::from_ref(state);

        let subject = resolver.resolve(session.credential_id).await?;
        if subject != session.subject_claim {
            tracing::warn!(
                credential_id = %session.credential_id,
                "Session entry subject differs from credential claim"
            );
            return Err(SessionRejection::unauthorized());
        }

        Ok(Self { subject, session })
    }
}

/// Raw bearer token from the `Authorization` header.
///
/// Does no verification. Used by endpoints that hand the credential to the
/// auth service themselves, such as logout.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = SessionRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .map(|token| Self(token.to_string()))
            .ok_or_else(SessionRejection::unauthorized)
    }
}
