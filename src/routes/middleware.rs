// src/routes/middleware.rs
//! Per-request middleware shared by the routes in this directory.
//!
//! The gateway (`mod.rs`) stacks these in a fixed order: panic recovery
//! outermost, then request ID, then request/response logging. The CORS
//! middleware is attached to `/data` only and sits closest to the handler.

use std::{any::Any, net::SocketAddr, time::Instant};

use axum::{
    extract::{ConnectInfo, MatchedPath, Request, State},
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, USER_AGENT,
        },
        HeaderValue, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::Instrument;
use uuid::Uuid;

use crate::AppState;

pub const X_REQUEST_ID: &str = "x-request-id";

// ---

/// Tag the request with a fresh UUID.
///
/// The ID is echoed in `X-Request-ID` and recorded on a `request` span, so
/// every log line emitted while handling the request carries it.
pub async fn request_id(req: Request, next: Next) -> Response {
    // ---
    let id = Uuid::new_v4().to_string();
    let span = tracing::info_span!("request", request_id = %id);

    let mut res = next.run(req).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(X_REQUEST_ID, value);
    }
    res
}

/// Log the request on the way in and status + duration on the way out.
///
/// Also feeds the HTTP request metrics, labelled by matched route so unknown
/// paths cannot blow up label cardinality.
pub async fn log_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    // ---
    let start = Instant::now();

    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default();
    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();

    tracing::info!(%method, url = %path, %remote, %user_agent, "request");

    let res = next.run(req).await;

    let elapsed = start.elapsed();
    let status = res.status();
    tracing::info!(
        %method,
        url = %path,
        status = status.as_u16(),
        duration_ms = elapsed.as_secs_f64() * 1000.0,
        "response"
    );
    state
        .metrics
        .observe_request(method.as_str(), &route, status.as_u16(), elapsed);

    res
}

/// Open CORS for the dashboard. Every `OPTIONS` is answered directly.
pub async fn cors(req: Request, next: Next) -> Response {
    // ---
    let mut res = if req.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(req).await
    };

    let headers = res.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, X-Secret-Key"),
    );
    res
}

/// Turn a handler panic into a plain 500 so the server keeps running.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    // ---
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        *s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = %detail, "panic recovered");

    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}
