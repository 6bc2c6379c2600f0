//! Conversion of bridge errors into HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::Error;

/// Error response wrapper for the receive endpoint.
///
/// The body is the plain error text so remote write senders log the cause.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Decompression(_) | Error::Deserialization(_) => StatusCode::BAD_REQUEST,
            Error::Timeout(_) | Error::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::RowExecution(_)
            | Error::Commit(_)
            | Error::Store(_)
            | Error::InvalidConfig(_)
            | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.0.to_string()).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}
