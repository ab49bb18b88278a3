//! Session context attached to admitted requests.

use chrono::{DateTime, Utc};
use perch_auth_core::AdmittedSession;
use perch_types::{CredentialId, SubjectId};

/// Verified credential details available to handlers.
///
/// Produced by [`SessionLayer`](crate::SessionLayer) after stateless
/// verification. `subject_claim` is what the credential says, not what the
/// store says; use [`LiveIdentity`](crate::LiveIdentity) for attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    /// Unique id of the presented credential.
    pub credential_id: CredentialId,
    /// Subject decoded from the credential.
    pub subject_claim: SubjectId,
    /// When the presented credential expires.
    pub expires_at: DateTime<Utc>,
}

impl SessionContext {
    /// Seconds until the credential expires, zero if already past.
    #[must_use]
    pub fn expires_in_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

impl From<AdmittedSession> for SessionContext {
    fn from(session: AdmittedSession) -> Self {
        Self {
            credential_id: session.credential_id,
            subject_claim: session.subject_claim,
            expires_at: session.expires_at,
        }
    }
}

/// Extension key for storing the session context in request extensions.
#[derive(Debug, Clone)]
pub(crate) struct SessionContextExt(pub SessionContext);

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expires_in_secs_clamps_at_zero() {
        let now = Utc::now();
        let ctx = SessionContext {
            credential_id: CredentialId::new(),
            subject_claim: SubjectId::from(1u64),
            expires_at: now - Duration::seconds(5),
        };
        assert_eq!(ctx.expires_in_secs(now), 0);

        let ctx = SessionContext {
            expires_at: now + Duration::seconds(90),
            ..ctx
        };
        assert_eq!(ctx.expires_in_secs(now), 90);
    }
}
