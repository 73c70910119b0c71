//! Outbound call errors.

use axum::body::Bytes;
use axum::http::StatusCode;
use thiserror::Error;

use crate::client::context::CancelReason;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to create request: {0}")]
    Build(#[source] reqwest::Error),

    #[error("failed to encode body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("invalid header {name:?}")]
    Header { name: String },

    #[error("failed to execute request: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("failed to read body: {0}")]
    Body(#[source] reqwest::Error),

    /// The server answered with a status >= 400.
    #[error("api error status {}", status.as_u16())]
    Status { status: StatusCode, body: Bytes },

    /// Every attempt failed with a retryable outcome.
    #[error("all {attempts} attempts failed: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<ClientError>,
        body: Option<Bytes>,
    },

    /// The call context ended before the call finished.
    #[error("{reason}")]
    Cancelled {
        reason: CancelReason,
        body: Option<Bytes>,
    },
}

impl ClientError {
    /// Body of the last error response, if one was received.
    pub fn body(&self) -> Option<&Bytes> {
        match self {
            ClientError::Status { body, .. } => Some(body),
            ClientError::Exhausted { body, .. } | ClientError::Cancelled { body, .. } => {
                body.as_ref()
            }
            _ => None,
        }
    }

    /// Status of the last error response, if one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Exhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled { .. })
    }
}
