//! Common test utilities for perch-auth-core integration tests

pub mod mock_stores;

#[allow(unused_imports)]
pub use mock_stores::{FlakyStore, RecordingStore};

use perch_auth_core::AuthConfig;

/// Access secret used across integration tests
pub const ACCESS_SECRET: &str = "access-secret-for-integration-tests-0001";
/// Refresh secret used across integration tests
pub const REFRESH_SECRET: &str = "refresh-secret-for-integration-tests-001";

/// Valid configuration with the test secrets
#[allow(dead_code)]
pub fn test_config() -> AuthConfig {
    AuthConfig::try_new(ACCESS_SECRET, REFRESH_SECRET).expect("test secrets are valid")
}
