// src/routes/health.rs
//! Liveness endpoint for the ingestion service.
//!
//! `/health` is polled by container orchestrators and the device's own
//! watchdog to verify that the process answers HTTP. It is a sibling module
//! in the `routes` directory:
//! - Internal to this file: the handler and its response type
//! - Exports to the gateway (`mod.rs`): a subrouter containing `/health`

use axum::{routing::get, Json, Router};
use serde::Serialize;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Handle `GET /health`.
///
/// Returns a static JSON object. Deliberately touches neither the database
/// nor the filesystem.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Create a subrouter containing the `/health` route.
///
/// Generic over the application state so it merges cleanly with the gateway
/// router. Methods other than GET get a 405 from axum.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health))
}
