//! Application state

use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use perch_auth_core::{AuthService, IdentityResolver};
use perch_store::SessionStore;

use crate::config::Config;
use crate::users::UserDirectory;

/// Auth service over whichever store backend was configured
pub type AuthServiceImpl = AuthService<dyn SessionStore>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Credential issuance, verification and revocation
    pub auth: Arc<AuthServiceImpl>,
    /// Password verification and registration
    pub users: Arc<dyn UserDirectory>,
    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state
    pub fn new(auth: AuthServiceImpl, users: Arc<dyn UserDirectory>, config: Config) -> Self {
        Self {
            auth: Arc::new(auth),
            users,
            config: Arc::new(config),
        }
    }

    /// Get request timeout from config
    pub fn request_timeout(&self) -> Duration {
        self.config.request_timeout
    }
}

impl FromRef<AppState> for IdentityResolver<dyn SessionStore> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.identity()
    }
}
