//! Error types for the Auth API service.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use perch_auth_core::AuthError;
use perch_axum::SessionRejection;
use serde::Serialize;

use crate::users::UserError;

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Per-field validation messages, built fresh for every request
///
/// Serializes as a flat `{"field": "message"}` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for a field, keeping the first one
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }

    /// Single-field error
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }
}

/// Validation error body: `{"error": {"field": "message"}}`
#[derive(Debug, Serialize)]
struct ValidationResponse {
    error: FieldErrors,
}

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::InvalidCredentials => Self::InvalidCredentials,
            UserError::DuplicateEmail => Self::DuplicateEmail,
            UserError::Hashing(msg) => Self::Internal(msg),
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidCredentials | Self::DuplicateEmail => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(e) if e.is_unauthenticated() => StatusCode::UNAUTHORIZED,
            Self::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let fields = match self {
            // Same body as the session layer for every auth failure
            Self::Auth(e) => return SessionRejection(e).into_response(),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal API error");
                let body = ErrorResponse {
                    error: ErrorDetail {
                        code: "INTERNAL_ERROR".to_string(),
                        message: "An internal error occurred".to_string(),
                    },
                };
                return (status, Json(body)).into_response();
            }
            Self::Validation(fields) => fields,
            Self::InvalidCredentials => {
                FieldErrors::single("incorrect_details", "Incorrect email or password")
            }
            Self::DuplicateEmail => FieldErrors::single("taken_email", "Email already taken"),
        };

        (status, Json(ValidationResponse { error: fields })).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_keep_first_message() {
        let mut errors = FieldErrors::new();
        errors.add("email", "Required Email");
        errors.add("email", "Invalid Email");

        assert_eq!(errors.get("email"), Some("Required Email"));
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            serde_json::json!({ "email": "Required Email" })
        );
    }

    #[test]
    fn test_empty_field_errors_is_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Validation(FieldErrors::single("email", "x")).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ApiError::InvalidCredentials.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ApiError::Auth(AuthError::Expired).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Auth(AuthError::Internal("down".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
