use std::time::Duration;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::verify::VerifyError;

/// Suggested client backoff while the daily table loads.
const NOT_READY_RETRY: Duration = Duration::from_secs(5);

// Messages go straight to clients, never put table contents in them.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload")]
    MalformedPayload,

    #[error("Missing guess")]
    MissingGuess,

    #[error("Too many guesses, try again in {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("Today's word is not ready yet, try again shortly")]
    NotReady,
}

impl From<VerifyError> for AppError {
    fn from(e: VerifyError) -> Self {
        match e {
            VerifyError::EmptyGuess => AppError::MissingGuess,
            VerifyError::Malformed => AppError::MalformedPayload,
            VerifyError::NotReady(_) => AppError::NotReady,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, retry_after) = match &self {
            AppError::MalformedPayload | AppError::MissingGuess => (StatusCode::BAD_REQUEST, None),
            AppError::RateLimited { retry_after } => {
                (StatusCode::TOO_MANY_REQUESTS, Some(*retry_after))
            }
            AppError::NotReady => (StatusCode::SERVICE_UNAVAILABLE, Some(NOT_READY_RETRY)),
        };

        debug!("Rejected request: {self}");

        let mut response = (status, Json(json!({ "error": self.to_string() }))).into_response();

        if let Some(retry_after) = retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after.as_secs()));
        }

        response
    }
}
