// src/routes/health.rs
//! Liveness endpoints for the weatherflow service.
//!
//! `/health` is used by container orchestrators and CI pipelines to verify
//! that the process is up and answering HTTP; `/` returns the service banner.
//! Neither touches the store or the weather provider.

use axum::{routing::get, Json, Router};
use serde::Serialize;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// JSON response body for the `/` endpoint.
#[derive(Serialize)]
struct WelcomeResponse {
    message: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn welcome() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to the Weather Monitoring System",
    })
}

/// Create a subrouter containing `/` and `/health`.
///
/// Generic over the application state so it merges into the gateway router
/// whatever the service's source and store types are.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health))
}
