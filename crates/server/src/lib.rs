//! Garagem API server library.
//!
//! Vehicle entry/exit ledger, shared parking lots, movement reports and
//! occupancy analytics behind a JSON API. The binary wires [`build_router`]
//! to `PostgreSQL`; the integration tests wire it to the in-memory store.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, extract::State, http::StatusCode, routing::get};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::SessionStore;
use tracing::Span;

use crate::config::ConfigError;
use crate::error::AppError;
use crate::state::AppState;

/// Build the full application router.
///
/// # Middleware Order
///
/// Sentry (outermost), tracing span, request ID, session, then the rate
/// limiter on `/api/auth` when enabled.
///
/// # Errors
///
/// Returns `ConfigError` if the session secret cannot be used as a signing
/// key.
pub fn build_router<S>(state: AppState, session_store: S) -> Result<Router, ConfigError>
where
    S: SessionStore + Clone,
{
    let session_layer = middleware::create_session_layer(session_store, state.config())?;

    let mut auth_routes = routes::auth_routes();
    if state.config().rate_limit {
        match middleware::auth_rate_limiter() {
            Some(limiter) => auth_routes = auth_routes.layer(limiter),
            None => tracing::warn!("Auth rate limiter rejected its quota; running without it"),
        }
    }

    let api = Router::new()
        .nest("/auth", auth_routes)
        .merge(routes::api_routes());

    Ok(Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api)
        .fallback(not_found)
        .layer(session_layer)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        #[allow(clippy::cast_possible_truncation)]
                        span.record("latency_ms", latency.as_millis() as u64);
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction()))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the record store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn not_found() -> AppError {
    AppError::NotFound("Rota não encontrada".to_string())
}
