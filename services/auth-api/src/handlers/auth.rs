//! Authentication handlers (login, logout, refresh, register, me)

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use perch_auth_core::{AuthError, Revocation};
use perch_axum::{BearerToken, LiveIdentity};
use perch_types::TokenPair;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::state::AppState;

/// Minimum password length accepted at registration
pub const MIN_PASSWORD_LEN: usize = 6;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Which rule set a credentials body is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Login,
    Register,
}

impl CredentialsRequest {
    fn validate(&self, action: Action) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();

        let email = self.email.trim();
        if email.is_empty() {
            errors.add("required_email", "Required Email");
        } else if !is_valid_email(email) {
            errors.add("invalid_email", "Invalid Email");
        }

        if self.password.is_empty() {
            errors.add("required_password", "Required Password");
        } else if action == Action::Register && self.password.len() < MIN_PASSWORD_LEN {
            errors.add(
                "invalid_password",
                format!("Password should be at least {MIN_PASSWORD_LEN} characters"),
            );
        }

        errors.into_result()
    }
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub credential_id: String,
    pub expires_at: String,
}

/// Map a body that failed to deserialize to a field error
fn body_or_unprocessable<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value).map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected request body");
        ApiError::Validation(FieldErrors::single("unmarshal_error", "Cannot unmarshal body"))
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/login
///
/// Check email and password, then issue an access/refresh pair
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<Json<TokenPair>> {
    let req = body_or_unprocessable(body)?;
    req.validate(Action::Login)?;

    let subject = state.users.verify_password(&req.email, &req.password).await?;
    let pair = state.auth.login(&subject).await?;

    metrics::counter!("auth_logins_total").increment(1);
    tracing::info!(subject = %subject, "Login succeeded");

    Ok(Json(pair.into()))
}

/// POST /api/logout
///
/// Revoke the presented access credential. A second logout with the same
/// credential is rejected like any other unusable credential.
pub async fn logout(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> ApiResult<Json<&'static str>> {
    let outcome = state.auth.logout(&token).await?;
    metrics::counter!("auth_logouts_total", "outcome" => outcome.as_str()).increment(1);

    match outcome {
        Revocation::Revoked => Ok(Json("Successfully logged out")),
        Revocation::AlreadyRevoked => Err(AuthError::Unauthorized.into()),
    }
}

/// POST /api/refresh
///
/// Exchange a refresh credential for a new pair. Each refresh credential
/// works once.
pub async fn refresh(
    State(state): State<AppState>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<TokenPair>> {
    let req = body_or_unprocessable(body)?;
    let pair = state.auth.refresh(req.refresh_token.trim()).await?;

    metrics::counter!("auth_refresh_total").increment(1);
    Ok(Json(pair.into()))
}

/// POST /api/register
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let req = body_or_unprocessable(body)?;
    req.validate(Action::Register)?;

    let user = state.users.register(&req.email, &req.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id.to_string(),
            email: user.email,
        }),
    ))
}

/// GET /api/me
///
/// Current subject as recorded in the session store
pub async fn me(State(state): State<AppState>, identity: LiveIdentity) -> Json<MeResponse> {
    let email = state.users.find(&identity.subject).await.map(|user| user.email);

    Json(MeResponse {
        id: identity.subject.to_string(),
        email,
        credential_id: identity.session.credential_id.to_string(),
        expires_at: identity.session.expires_at.to_rfc3339(),
    })
}
