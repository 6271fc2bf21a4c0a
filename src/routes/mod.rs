use std::time::Duration;

use axum::{
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer};

use crate::AppState;

mod health;
mod home;
mod metrics;
mod middleware;
mod readings;

/// Blanket per-request deadline.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Status for a request that overran its deadline. Reported as a server
/// failure like any other storage stall.
const TIMEOUT_STATUS: StatusCode = StatusCode::INTERNAL_SERVER_ERROR;

// ---

pub fn router(state: AppState) -> Router {
    // ---
    let app = Router::new()
        .merge(health::router())
        .merge(home::router())
        .merge(readings::router());

    // `/metrics` is mounted after the layers and is served bare
    with_middleware(app, state.clone())
        .merge(metrics::router())
        .with_state(state)
}

/// Wrap routes in the request pipeline.
///
/// Layers listed first are outermost: panic recovery, timeout, request ID,
/// then request/response logging.
fn with_middleware(routes: Router<AppState>, state: AppState) -> Router<AppState> {
    // ---
    routes.layer(
        ServiceBuilder::new()
            .layer(CatchPanicLayer::custom(middleware::handle_panic))
            .layer(TimeoutLayer::with_status_code(TIMEOUT_STATUS, REQUEST_TIMEOUT))
            .layer(from_fn(middleware::request_id))
            .layer(from_fn_with_state(state, middleware::log_requests)),
    )
}
