use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    middleware,
    routing::get,
    Json, Router,
};
use tracing::{debug, info};

use super::middleware::cors;
use crate::{
    error::{AppError, Result},
    store::{self, ReadingsFilter, ReadingsQuery},
    AppState, NewReading, Reading,
};

pub const SECRET_HEADER: &str = "x-secret-key";

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route(
        "/data",
        get(list_readings)
            .post(create_reading)
            .layer(middleware::from_fn(cors)),
    )
}

/// Handle `POST /data` from the device.
///
/// The secret is checked before the body is decoded, so a rejected request
/// never reaches storage. The body is decoded regardless of `Content-Type`.
async fn create_reading(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Reading>> {
    // ---
    let presented = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    debug!(present = presented.is_some(), "X-Secret-Key header");
    if !state.secret_matches(presented) {
        return Err(AppError::Forbidden);
    }

    let payload: NewReading = serde_json::from_slice(&body)?;
    info!(data = ?payload, "Received temperature reading");

    let reading = store::insert_reading(&state.pool, &payload).await?;
    state.metrics.reading_ingested();
    debug!(id = reading.id, timestamp = reading.timestamp, "Stored reading");

    Ok(Json(reading))
}

/// Handle `GET /data`: newest readings first, optionally bounded in time.
async fn list_readings(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Reading>>> {
    // ---
    let params = ReadingsQuery::from_pairs(pairs);
    let filter = ReadingsFilter::from_query(&params);
    debug!(?filter, "Listing readings");

    let readings = store::list_readings(&state.pool, &filter).await?;
    Ok(Json(readings))
}
