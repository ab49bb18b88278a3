//! Perch Auth Core - Session authentication and revocation
//!
//! Issues signed access/refresh credential pairs, verifies them statelessly
//! on every request, and resolves identity against a revocable session store.

pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod issuer;
pub mod resolver;
pub mod revocation;
pub mod service;

pub use codec::{Credential, CredentialClaims, CredentialCodec};
pub use config::{AuthConfig, DEFAULT_ACCESS_TTL, DEFAULT_REFRESH_TTL};
pub use crypto::{constant_time_eq, HmacKey, HmacKeyError};
pub use error::AuthError;
pub use identity::IdentityResolver;
pub use issuer::{IssuedPair, TokenIssuer};
pub use resolver::{bearer_token, AdmittedSession, SessionResolver};
pub use revocation::{Revocation, RevocationService};
pub use service::AuthService;
