//! Configuration types for the auth subsystem

use std::time::Duration;

use crate::crypto::HmacKey;
use crate::AuthError;

/// Default access credential lifetime (15 minutes)
pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(15 * 60);

/// Default refresh credential lifetime (7 days)
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Auth subsystem configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC secret for access credentials
    pub access_secret: String,
    /// HMAC secret for refresh credentials (must differ from the access secret)
    pub refresh_secret: String,
    /// Access credential lifetime
    pub access_ttl: Duration,
    /// Refresh credential lifetime
    pub refresh_ttl: Duration,
    /// Whether logout also revokes the paired refresh credential
    pub revoke_refresh_on_logout: bool,
}

impl AuthConfig {
    /// Create a new auth config, validating both secrets
    pub fn try_new(
        access_secret: impl Into<String>,
        refresh_secret: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let config = Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl: DEFAULT_ACCESS_TTL,
            refresh_ttl: DEFAULT_REFRESH_TTL,
            revoke_refresh_on_logout: true,
        };
        config.validate()?;
        Ok(config)
    }

    /// Set access credential lifetime
    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    /// Set refresh credential lifetime
    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    /// Set whether logout revokes the paired refresh credential
    pub fn with_revoke_refresh_on_logout(mut self, revoke: bool) -> Self {
        self.revoke_refresh_on_logout = revoke;
        self
    }

    /// Check secrets and lifetimes
    pub fn validate(&self) -> Result<(), AuthError> {
        HmacKey::new(&self.access_secret)
            .map_err(|e| AuthError::Configuration(format!("access secret: {e}")))?;
        HmacKey::new(&self.refresh_secret)
            .map_err(|e| AuthError::Configuration(format!("refresh secret: {e}")))?;

        if self.access_secret == self.refresh_secret {
            return Err(AuthError::Configuration(
                "access and refresh secrets must differ".to_string(),
            ));
        }
        if self.access_ttl.is_zero() || self.refresh_ttl.is_zero() {
            return Err(AuthError::Configuration(
                "credential lifetimes must be greater than zero".to_string(),
            ));
        }
        if self.access_ttl > self.refresh_ttl {
            tracing::warn!(
                access_ttl_secs = self.access_ttl.as_secs(),
                refresh_ttl_secs = self.refresh_ttl.as_secs(),
                "Access credentials outlive refresh credentials"
            );
        }
        Ok(())
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("revoke_refresh_on_logout", &self.revoke_refresh_on_logout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(c: char) -> String {
        c.to_string().repeat(32)
    }

    #[test]
    fn test_defaults() {
        let config = AuthConfig::try_new(secret('a'), secret('r')).unwrap();
        assert_eq!(config.access_ttl, Duration::from_secs(900));
        assert_eq!(config.refresh_ttl, Duration::from_secs(604_800));
        assert!(config.revoke_refresh_on_logout);
    }

    #[test]
    fn test_short_secret_rejected() {
        let result = AuthConfig::try_new("short", secret('r'));
        assert!(matches!(result, Err(AuthError::Configuration(_))));
    }

    #[test]
    fn test_identical_secrets_rejected() {
        let result = AuthConfig::try_new(secret('a'), secret('a'));
        assert!(matches!(result, Err(AuthError::Configuration(_))));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = AuthConfig::try_new(secret('a'), secret('r'))
            .unwrap()
            .with_access_ttl(Duration::ZERO);
        assert!(matches!(config.validate(), Err(AuthError::Configuration(_))));
    }

    #[test]
    fn test_debug_omits_secrets() {
        let config = AuthConfig::try_new(secret('a'), secret('r')).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains(&secret('a')));
        assert!(rendered.contains("access_ttl"));
    }
}
