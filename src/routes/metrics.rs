use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::{error::AppError, AppState};

// ---

pub fn router() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics))
}

/// Prometheus scrape endpoint.
async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    // ---
    let body = state
        .metrics
        .render()
        .map_err(|e| AppError::Internal(format!("encoding metrics: {}", e)))?;

    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, prometheus::TEXT_FORMAT)],
        body,
    ))
}
