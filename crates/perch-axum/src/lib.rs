//! Perch Axum Integration
//!
//! Axum middleware and extractors for Perch session authentication.
//!
//! # Overview
//!
//! - **Middleware**: [`SessionLayer`] verifies the bearer credential on every
//!   request and rejects anything that is not a valid access credential
//! - **Extractors**: [`RequireSession`], [`MaybeSession`], [`LiveIdentity`],
//!   [`BearerToken`]
//!
//! The layer is stateless and never consults the session store. Handlers that
//! attribute or mutate data take [`LiveIdentity`], which resolves the subject
//! against the store so that revoked credentials are refused.
//!
//! # Quick Start
//!
//! ```ignore
//! use perch_axum::{LiveIdentity, SessionLayer};
//! use axum::{Router, routing::get};
//!
//! async fn whoami(identity: LiveIdentity) -> String {
//!     format!("Hello, {}!", identity.subject)
//! }
//!
//! let app = Router::new()
//!     .route("/api/me", get(whoami))
//!     .layer(SessionLayer::new(auth.resolver()))
//!     .with_state(state);
//! ```

pub mod context;
pub mod error;
pub mod extractors;
pub mod layer;

pub use context::SessionContext;
pub use error::SessionRejection;
pub use extractors::{BearerToken, LiveIdentity, MaybeSession, RequireSession};
pub use layer::{SessionConfig, SessionLayer, SessionService};
