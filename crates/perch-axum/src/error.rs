//! Rejection type for session middleware and extractors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use perch_auth_core::AuthError;
use serde::Serialize;

/// Error response body
#[derive(Debug, Serialize)]
struct RejectionResponse {
    error: RejectionDetail,
}

#[derive(Debug, Serialize)]
struct RejectionDetail {
    code: &'static str,
    message: &'static str,
}

/// Rejection returned when a request cannot be admitted.
///
/// Every verification failure renders the same 401 body so clients cannot
/// tell a malformed credential from an expired or revoked one. The precise
/// cause is only logged.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct SessionRejection(#[from] pub AuthError);

impl SessionRejection {
    /// Rejection for a request without a usable credential.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self(AuthError::Unauthorized)
    }

    /// HTTP status this rejection renders as.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        if self.0.is_unauthenticated() {
            StatusCode::UNAUTHORIZED
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for SessionRejection {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = if status == StatusCode::UNAUTHORIZED {
            tracing::debug!(reason = self.0.error_code(), "Request rejected");
            metrics::counter!("auth_rejections_total").increment(1);
            RejectionDetail {
                code: "UNAUTHORIZED",
                message: "unauthorized",
            }
        } else {
            tracing::error!(error = %self.0, "Session check failed");
            RejectionDetail {
                code: "INTERNAL_ERROR",
                message: "An internal error occurred",
            }
        };

        (status, Json(RejectionResponse { error: detail })).into_response()
    }
}
