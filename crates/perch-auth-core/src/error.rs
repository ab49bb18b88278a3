//! Auth errors

use thiserror::Error;

/// Authentication errors
///
/// Every verification kind maps to 401 without detail so callers cannot tell
/// a malformed credential from an expired or revoked one.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Credential could not be decoded
    #[error("malformed credential")]
    Malformed,

    /// Signature does not match (tampered or forged)
    #[error("invalid signature")]
    InvalidSignature,

    /// Credential is past its expiry instant
    #[error("credential expired")]
    Expired,

    /// Refresh credential used where an access credential is required, or the
    /// reverse
    #[error("wrong credential kind")]
    WrongKind,

    /// Missing credential, or credential absent from the session store
    /// (revoked, expired or never issued)
    #[error("unauthorized")]
    Unauthorized,

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Store or codec infrastructure failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Malformed
            | Self::InvalidSignature
            | Self::Expired
            | Self::WrongKind
            | Self::Unauthorized => 401,
            Self::Configuration(_) | Self::Internal(_) => 500,
        }
    }

    /// Get error code for logs and metrics
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Malformed => "MALFORMED",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::Expired => "EXPIRED",
            Self::WrongKind => "WRONG_KIND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this is a client-side authentication failure
    pub fn is_unauthenticated(&self) -> bool {
        self.status_code() == 401
    }
}

impl From<perch_store::StoreError> for AuthError {
    fn from(err: perch_store::StoreError) -> Self {
        tracing::error!("Session store error: {}", err);
        Self::Internal(err.to_string())
    }
}
