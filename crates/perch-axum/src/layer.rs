//! Tower middleware layer for session verification.
//!
//! The [`SessionLayer`] admits requests carrying a valid access credential in
//! `Authorization: Bearer <token>` and attaches a
//! [`SessionContext`](crate::SessionContext) to the request extensions.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::response::IntoResponse;
use perch_auth_core::{AdmittedSession, AuthError, SessionResolver};
use pin_project_lite::pin_project;
use tower::{Layer, Service};

use crate::context::{SessionContext, SessionContextExt};
use crate::error::SessionRejection;

/// Configuration for the session middleware layer.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Whether requests without a valid credential are rejected.
    ///
    /// When false, such requests pass through without a session context and
    /// handlers decide via [`MaybeSession`](crate::MaybeSession).
    pub require_session: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            require_session: true,
        }
    }
}

impl SessionConfig {
    /// Create a new config builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether a valid session is required.
    #[must_use]
    pub fn require_session(mut self, require: bool) -> Self {
        self.require_session = require;
        self
    }
}

/// Tower layer that verifies session credentials.
#[derive(Debug, Clone)]
pub struct SessionLayer {
    resolver: SessionResolver,
    config: SessionConfig,
}

impl SessionLayer {
    /// Create a layer that rejects requests without a valid access credential.
    #[must_use]
    pub fn new(resolver: SessionResolver) -> Self {
        Self {
            resolver,
            config: SessionConfig::default(),
        }
    }

    /// Create a layer with custom configuration.
    #[must_use]
    pub fn with_config(resolver: SessionResolver, config: SessionConfig) -> Self {
        Self { resolver, config }
    }
}

impl<S> Layer<S> for SessionLayer {
    type Service = SessionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionService {
            inner,
            resolver: self.resolver.clone(),
            config: self.config.clone(),
        }
    }
}

/// The session verification service.
#[derive(Debug, Clone)]
pub struct SessionService<S> {
    inner: S,
    resolver: SessionResolver,
    config: SessionConfig,
}

impl<S> SessionService<S> {
    /// Verify the credential carried by the request.
    fn admit(&self, req: &Request<Body>) -> Result<AdmittedSession, AuthError> {
        let authorization = match req.headers().get(header::AUTHORIZATION) {
            Some(value) => Some(value.to_str().map_err(|_| AuthError::Malformed)?),
            None => None,
        };
        self.resolver.admit_authorization(authorization)
    }
}

impl<S> Service<Request<Body>> for SessionService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = SessionFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        match self.admit(&req) {
            Ok(session) => {
                tracing::trace!(credential_id = %session.credential_id, "Session admitted");
                req.extensions_mut()
                    .insert(SessionContextExt(SessionContext::from(session)));
            }
            Err(error) if self.config.require_session => {
                return SessionFuture {
                    state: FutureState::Rejected {
                        response: Some(SessionRejection(error).into_response()),
                    },
                };
            }
            Err(error) => {
                tracing::trace!(reason = error.error_code(), "Passing through without session");
            }
        }

        // The clone may not be ready; swap so the ready service handles this request.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        SessionFuture {
            state: FutureState::Calling {
                future: inner.call(req),
            },
        }
    }
}

pin_project! {
    /// Future for the session service.
    pub struct SessionFuture<F> {
        #[pin]
        state: FutureState<F>,
    }
}

pin_project! {
    #[project = FutureStateProj]
    enum FutureState<F> {
        Rejected {
            response: Option<Response<Body>>,
        },
        Calling {
            #[pin]
            future: F,
        },
    }
}

impl<F, E> Future for SessionFuture<F>
where
    F: Future<Output = Result<Response<Body>, E>>,
{
    type Output = Result<Response<Body>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project().state.project() {
            FutureStateProj::Rejected { response } => match response.take() {
                Some(response) => Poll::Ready(Ok(response)),
                None => panic!("polled after completion"),
            },
            FutureStateProj::Calling { future } => future.poll(cx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        assert!(SessionConfig::default().require_session);

        let config = SessionConfig::new().require_session(false);
        assert!(!config.require_session);
    }
}
