//! Axum route handlers for the reference service.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use taskhook::ServiceConfig;
use taskhook::auth;
use tower_http::trace::TraceLayer;

/// Shared application state.
pub type ServiceState = Arc<ServiceConfig>;

/// `GET /health` — Liveness probe.
///
/// Answers 200 for callers presenting the internal bearer secret or
/// connecting from a loopback address, and 403 for everyone else.
pub async fn health(
    State(config): State<ServiceState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let trusted = auth::is_authenticated(&headers, &config.internal_api_secret)
        || peer.ip().to_canonical().is_loopback();
    if !trusted {
        return StatusCode::FORBIDDEN.into_response();
    }

    Json(serde_json::json!({
        "status": "ok",
        "service": config.service_name,
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .into_response()
}

/// Builds the service router.
pub fn service_router(state: ServiceState) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
