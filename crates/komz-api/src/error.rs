//! Error types for komz-api

use std::time::Duration;

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Shown to visitors who used up their demo messages.
pub const RATE_LIMIT_MESSAGE: &str =
    "You've reached the message limit for this demo. Please try again in an hour.";

/// Result type alias for komz-api operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while starting or running the gateway.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from komz-core
    #[error("Core error: {0}")]
    Core(#[from] komz_core::Error),

    /// Error from komz-client
    #[error("Client error: {0}")]
    Client(#[from] komz_client::Error),

    /// Listener or socket error
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error returned by request handlers, rendered as `{"error": message}`.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request itself is unusable.
    #[error("{0}")]
    BadRequest(String),

    /// The caller is out of demo messages.
    #[error("{}", RATE_LIMIT_MESSAGE)]
    RateLimited {
        /// Time until the window resets
        retry_after: Duration,
    },

    /// A third-party provider call failed.
    #[error("{0}")]
    Upstream(String),

    /// Something failed inside the gateway.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Whole seconds, rounded up, so clients never retry early.
fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::RateLimited { retry_after } => {
                let secs = ceil_secs(retry_after);
                let body = serde_json::json!({
                    "error": RATE_LIMIT_MESSAGE,
                    "retry_after_secs": secs,
                });
                let mut response = (status, Json(body)).into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs));
                response
            }
            other => {
                let body = serde_json::json!({ "error": other.to_string() });
                (status, Json(body)).into_response()
            }
        }
    }
}

impl From<komz_core::Error> for ApiError {
    fn from(err: komz_core::Error) -> Self {
        match err {
            komz_core::Error::Validation { message, .. } => ApiError::BadRequest(message),
            komz_core::Error::RateLimited { retry_after, .. } => {
                ApiError::RateLimited { retry_after }
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<komz_client::Error> for ApiError {
    fn from(err: komz_client::Error) -> Self {
        match err {
            komz_client::Error::MissingAgentId => {
                ApiError::BadRequest(komz_client::Error::MissingAgentId.to_string())
            }
            komz_client::Error::Core(core) => core.into(),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}
