//! Credential codec with HMAC signing
//!
//! A credential is `base64url(json(claims)).base64url(hmac_sha256(payload))`,
//! the same signed-payload layout used for session cookies. Access and
//! refresh credentials are signed with independent keys; the key that
//! authenticates the signature determines the kind, and the signed `kind`
//! claim must agree with it.
//!
//! Verification is pure: no store round-trip happens here, so malformed,
//! forged and expired credentials are rejected before any I/O.

use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use perch_types::{CredentialId, SubjectId, TokenKind};
use serde::{Deserialize, Serialize};

use crate::crypto::{constant_time_eq, HmacKey};
use crate::AuthError;

/// Claims carried by every credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialClaims {
    /// Subject the credential was issued to
    pub sub: SubjectId,
    /// Per-issuance unique id (session store key)
    pub uid: CredentialId,
    /// Credential kind
    pub kind: TokenKind,
    /// Issue timestamp (milliseconds)
    pub iat: i64,
    /// Expiration timestamp (milliseconds)
    pub exp: i64,
    /// Unique id of the paired refresh credential (access credentials only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pair: Option<CredentialId>,
}

impl CredentialClaims {
    /// Check if the credential is expired at the given instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() > self.exp
    }

    /// Expiry as a timestamp
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.exp).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Time left before expiry at the given instant (zero once expired)
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        let millis = self.exp.saturating_sub(now.timestamp_millis());
        u64::try_from(millis)
            .map(Duration::from_millis)
            .unwrap_or(Duration::ZERO)
    }
}

/// A signed credential together with its decoded claims
#[derive(Debug, Clone)]
pub struct Credential {
    /// Encoded credential handed to the client
    pub token: String,
    /// Claims covered by the signature
    pub claims: CredentialClaims,
}

/// Signs and verifies access and refresh credentials
#[derive(Clone)]
pub struct CredentialCodec {
    access_key: HmacKey,
    refresh_key: HmacKey,
}

impl CredentialCodec {
    /// Create a codec from the access and refresh secrets
    ///
    /// # Errors
    /// Returns `Configuration` if either secret is shorter than 32 bytes or
    /// both secrets are identical.
    pub fn new(
        access_secret: impl AsRef<[u8]>,
        refresh_secret: impl AsRef<[u8]>,
    ) -> Result<Self, AuthError> {
        if constant_time_eq(access_secret.as_ref(), refresh_secret.as_ref()) {
            return Err(AuthError::Configuration(
                "access and refresh secrets must differ".to_string(),
            ));
        }
        let access_key = HmacKey::new(access_secret)
            .map_err(|e| AuthError::Configuration(format!("access secret: {e}")))?;
        let refresh_key = HmacKey::new(refresh_secret)
            .map_err(|e| AuthError::Configuration(format!("refresh secret: {e}")))?;
        Ok(Self {
            access_key,
            refresh_key,
        })
    }

    /// Issue a credential valid for `validity` from now
    pub fn issue(
        &self,
        subject: &SubjectId,
        kind: TokenKind,
        validity: Duration,
    ) -> Result<Credential, AuthError> {
        self.issue_at(subject, kind, validity, Utc::now())
    }

    /// Issue a credential valid for `validity` from `now`
    pub fn issue_at(
        &self,
        subject: &SubjectId,
        kind: TokenKind,
        validity: Duration,
        now: DateTime<Utc>,
    ) -> Result<Credential, AuthError> {
        self.mint(subject, kind, validity, None, now)
    }

    /// Issue an access credential that references its refresh credential
    pub(crate) fn issue_paired_access(
        &self,
        subject: &SubjectId,
        validity: Duration,
        refresh: CredentialId,
        now: DateTime<Utc>,
    ) -> Result<Credential, AuthError> {
        self.mint(subject, TokenKind::Access, validity, Some(refresh), now)
    }

    fn mint(
        &self,
        subject: &SubjectId,
        kind: TokenKind,
        validity: Duration,
        pair: Option<CredentialId>,
        now: DateTime<Utc>,
    ) -> Result<Credential, AuthError> {
        let validity_ms = i64::try_from(validity.as_millis())
            .map_err(|_| AuthError::Configuration("credential validity too large".to_string()))?;
        let iat = now.timestamp_millis();
        let exp = iat
            .checked_add(validity_ms)
            .ok_or_else(|| AuthError::Configuration("credential expiry overflows".to_string()))?;

        let claims = CredentialClaims {
            sub: subject.clone(),
            uid: CredentialId::new(),
            kind,
            iat,
            exp,
            pair,
        };
        let token = self.sign(&claims)?;

        Ok(Credential { token, claims })
    }

    /// Sign claims with the key for their kind
    pub fn sign(&self, claims: &CredentialClaims) -> Result<String, AuthError> {
        let payload_json = serde_json::to_vec(claims).map_err(|e| {
            tracing::error!("Failed to serialize claims: {}", e);
            AuthError::Internal("Failed to encode credential".to_string())
        })?;
        Ok(self.sign_payload(claims.kind, &payload_json))
    }

    fn sign_payload(&self, kind: TokenKind, payload_json: &[u8]) -> String {
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload_json);
        let signature = self.compute_signature(self.key(kind), &payload_b64);
        format!("{payload_b64}.{signature}")
    }

    /// Verify a credential against the current time
    pub fn verify(&self, raw: &str) -> Result<CredentialClaims, AuthError> {
        self.verify_at(raw, Utc::now())
    }

    /// Verify a credential against the given instant
    ///
    /// Checks, in order: structure (`Malformed`), signature under either key
    /// (`InvalidSignature`), payload decoding (`Malformed`), agreement of the
    /// signed kind with the signing key (`InvalidSignature`) and expiry
    /// (`Expired`).
    pub fn verify_at(&self, raw: &str, now: DateTime<Utc>) -> Result<CredentialClaims, AuthError> {
        let (payload_b64, signature) = split_credential(raw)?;

        let signed_kind = if self.signature_matches(TokenKind::Access, payload_b64, signature) {
            TokenKind::Access
        } else if self.signature_matches(TokenKind::Refresh, payload_b64, signature) {
            TokenKind::Refresh
        } else {
            tracing::debug!("Credential signature mismatch");
            return Err(AuthError::InvalidSignature);
        };

        let payload_json = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| AuthError::Malformed)?;
        let claims: CredentialClaims =
            serde_json::from_slice(&payload_json).map_err(|_| AuthError::Malformed)?;

        if claims.kind != signed_kind {
            tracing::warn!(
                claimed = %claims.kind,
                signed = %signed_kind,
                "Credential kind does not match signing key"
            );
            return Err(AuthError::InvalidSignature);
        }

        if claims.is_expired_at(now) {
            return Err(AuthError::Expired);
        }

        Ok(claims)
    }

    fn signature_matches(&self, kind: TokenKind, payload_b64: &str, signature: &str) -> bool {
        let expected = self.compute_signature(self.key(kind), payload_b64);
        constant_time_eq(signature.as_bytes(), expected.as_bytes())
    }

    fn compute_signature(&self, key: &HmacKey, data: &str) -> String {
        URL_SAFE_NO_PAD.encode(key.sign(data.as_bytes()))
    }

    fn key(&self, kind: TokenKind) -> &HmacKey {
        match kind {
            TokenKind::Access => &self.access_key,
            TokenKind::Refresh => &self.refresh_key,
        }
    }
}

impl std::fmt::Debug for CredentialCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCodec").finish_non_exhaustive()
    }
}

/// Split `payload.signature`, rejecting anything that is not two non-empty
/// base64url segments
fn split_credential(raw: &str) -> Result<(&str, &str), AuthError> {
    let (payload, signature) = raw.split_once('.').ok_or(AuthError::Malformed)?;
    if payload.is_empty() || signature.is_empty() {
        return Err(AuthError::Malformed);
    }
    if !is_base64url(payload) || !is_base64url(signature) {
        return Err(AuthError::Malformed);
    }
    Ok((payload, signature))
}

fn is_base64url(segment: &str) -> bool {
    segment
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
