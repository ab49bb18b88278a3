//! Perch Auth API
//!
//! Session authentication service.
//!
//! ## REST Endpoints
//!
//! - `POST /api/login` - Exchange email and password for a credential pair
//! - `POST /api/logout` - Revoke the presented access credential
//! - `POST /api/refresh` - Rotate a refresh credential into a new pair
//! - `POST /api/register` - Create a user
//! - `GET /api/me` - Current subject (requires a live access credential)
//!
//! ## Health Endpoints
//!
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;
pub mod users;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use perch_auth_core::AuthService;
use perch_axum::SessionLayer;
use perch_store::{MemorySessionStore, SessionStore};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::{Config, StoreBackend};
use crate::handlers::{health, ready};
use crate::state::AppState;
use crate::users::MemoryUserDirectory;

/// Build the session store selected by configuration
pub async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn SessionStore>> {
    match config.store_backend {
        StoreBackend::Redis => {
            let dsn = config
                .redis_dsn
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("REDIS_DSN is required for the redis store"))?;
            let store = perch_store::connect(dsn)
                .await?
                .with_key_prefix(config.redis_key_prefix.clone());
            tracing::info!("Using redis session store");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-process session store; sessions are lost on restart");
            Ok(Arc::new(MemorySessionStore::new()))
        }
    }
}

/// Wire the auth service and user directory into application state
pub fn build_state(config: Config, store: Arc<dyn SessionStore>) -> anyhow::Result<AppState> {
    let auth = AuthService::new(config.auth.clone(), store)?;
    let users = Arc::new(MemoryUserDirectory::new());
    Ok(AppState::new(auth, users, config))
}

pub fn build_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let request_timeout = state.request_timeout();

    // Routes that require a verified access credential
    let protected = Router::new()
        .route("/me", get(handlers::me))
        .route_layer(SessionLayer::new(state.auth.resolver()));

    // API routes, mounted under /api as clients expect
    let api = Router::new()
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/refresh", post(handlers::refresh))
        .route("/register", post(handlers::register))
        .merge(protected);

    // Health routes (no timeout - must always respond quickly)
    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Metrics route (no timeout)
    let metrics_route = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    // Build middleware stack (order matters - outermost first)
    let middleware = ServiceBuilder::new()
        // Request ID propagation (outermost)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        // Tracing with request details
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // CORS
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        // Request timeout (innermost - closest to handler)
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .nest("/api", api)
        .layer(middleware)
        .merge(health_routes)
        .merge(metrics_route)
        .with_state(state)
}

/// Install the Prometheus recorder and describe the service's counters
pub fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    metrics::describe_counter!("auth_logins_total", "Total successful logins");
    metrics::describe_counter!("auth_logouts_total", "Total logouts by outcome");
    metrics::describe_counter!("auth_refresh_total", "Total refresh credential rotations");
    metrics::describe_counter!(
        "auth_rejections_total",
        "Total requests rejected for an unusable credential"
    );

    Ok(handle)
}
