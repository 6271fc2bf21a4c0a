use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::{
    error::{AppError, Result},
    AppState,
};

// ---

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(home))
}

/// Serve the dashboard page, read from disk on every request so it can be
/// replaced without a restart. The bytes go out as stored; the page's
/// encoding is the browser's concern.
async fn home(State(state): State<AppState>) -> Result<impl IntoResponse> {
    // ---
    let page = tokio::fs::read(state.index_file.as_path())
        .await
        .map_err(|e| {
            AppError::Internal(format!("reading {}: {}", state.index_file.display(), e))
        })?;

    Ok(([(CONTENT_TYPE, "text/html")], page))
}
