//! HTTP error mapping. Bodies are the plain error message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use crate::core::Error;

#[derive(Debug)]
pub enum ApiError {
    /// Request rejected or failed inside the service
    Service(Error),
    /// Body could not be decoded
    BadRequest(String),
    NotFound(String),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError::Service(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Service(e) if e.is_rejection() => {
                warn!("Rejected: {}", e);
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::Service(e) => {
                error!("Request failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::BadRequest(msg) => {
                warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, msg)
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };
        (status, message).into_response()
    }
}
