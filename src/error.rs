//! Application errors.
//!
//! # Responsibilities
//! - Carry an HTTP status and a message that is safe to show to clients
//! - Keep the underlying cause for logs without exposing it on the wire
//!
//! # Design Decisions
//! - `AppError` is the only "known" error; everything else is masked as 500
//! - Handlers return `BoxError` so `?` works on any error type

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::http::response::error_response;

/// Type-erased error returned by handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An error with an explicit status code and a client-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AppError {
    /// HTTP status written to the response.
    pub code: StatusCode,
    /// Message written to the envelope's `error` field.
    pub message: String,
    /// Wrapped cause, never serialized.
    #[source]
    pub source: Option<BoxError>,
}

impl AppError {
    pub fn new(code: StatusCode, message: impl Into<String>, source: Option<BoxError>) -> Self {
        Self {
            code,
            message: message.into(),
            source,
        }
    }

    /// 400 with a fixed message; the cause is kept for logging.
    pub fn invalid_request(cause: impl Into<BoxError>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Invalid Request", Some(cause.into()))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message, None)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message, None)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", None)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error_response(self.code, &self.message)
    }
}

/// Find the first `AppError` in an error's source chain.
pub fn find_app_error<'a>(err: &'a (dyn std::error::Error + 'static)) -> Option<&'a AppError> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(app) = e.downcast_ref::<AppError>() {
            return Some(app);
        }
        current = e.source();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug, Error)]
    #[error("repository failed")]
    struct RepoError {
        #[source]
        inner: AppError,
    }

    #[test]
    fn test_display_is_message() {
        let err = AppError::not_found("user not found");
        assert_eq!(err.to_string(), "user not found");
        assert_eq!(err.code, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_request_keeps_cause() {
        let cause = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad json");
        let err = AppError::invalid_request(cause);

        assert_eq!(err.code, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Invalid Request");
        assert_eq!(err.source().unwrap().to_string(), "bad json");
    }

    #[test]
    fn test_constructors() {
        assert_eq!(AppError::unauthorized("nope").code, StatusCode::UNAUTHORIZED);
        let internal = AppError::internal();
        assert_eq!(internal.code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.message, "Internal Server Error");
        assert!(internal.source().is_none());
    }

    #[test]
    fn test_find_app_error_walks_chain() {
        let wrapped = RepoError {
            inner: AppError::not_found("missing"),
        };
        let boxed: BoxError = Box::new(wrapped);

        let found = find_app_error(boxed.as_ref()).expect("app error in chain");
        assert_eq!(found.message, "missing");

        let plain: BoxError = "boom".into();
        assert!(find_app_error(plain.as_ref()).is_none());
    }
}
