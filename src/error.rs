use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

// ---

/// Failures a request handler can surface to the client.
///
/// Storage detail is logged here and never echoed in the response body.
#[derive(Error, Debug)]
pub enum AppError {
    // ---
    #[error("missing or invalid X-Secret-Key header")]
    Forbidden,

    #[error("invalid reading payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // ---
        let (status, message) = match self {
            AppError::Forbidden => {
                tracing::debug!("Rejected request with bad secret key");
                (StatusCode::FORBIDDEN, "Forbidden")
            }
            AppError::InvalidPayload(ref e) => {
                tracing::error!(error = %e, "failed to decode temperature reading");
                (StatusCode::UNPROCESSABLE_ENTITY, "Bad request")
            }
            AppError::Database(ref e) => {
                tracing::error!(error = ?e, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (status, message).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
