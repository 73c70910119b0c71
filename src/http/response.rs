//! Response envelope and write-once response buffer.
//!
//! # Responsibilities
//! - Define the `{code, data, error}` JSON envelope
//! - Track whether a status has been committed for the current request
//!
//! # Design Decisions
//! - First status wins; later status writes are ignored
//! - A body write without a status commits 200
//! - One writer per request, owned by that request's task

use axum::body::Body;
use axum::http::header::{HeaderValue, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use serde::{Deserialize, Serialize};

pub const APPLICATION_JSON: &str = "application/json";

/// The single wire format for JSON responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: u16,
    pub data: T,
    /// Empty when there is no error.
    #[serde(default)]
    pub error: String,
}

/// Serialize an envelope with 2-space indentation and a trailing newline.
pub fn encode_envelope<T: Serialize>(
    status: StatusCode,
    data: T,
    error: Option<&str>,
) -> Result<Vec<u8>, serde_json::Error> {
    let envelope = Envelope {
        code: status.as_u16(),
        data,
        error: error.unwrap_or_default().to_string(),
    };
    let mut body = serde_json::to_vec_pretty(&envelope)?;
    body.push(b'\n');
    Ok(body)
}

/// Envelope response with `data: null`, for use outside a handler context.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    let mut writer = ResponseWriter::new();
    writer
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
    writer.write_header(status);
    match encode_envelope(status, (), Some(message)) {
        Ok(body) => writer.write(&body),
        Err(err) => tracing::error!(error = %err, "encoding json failed"),
    }
    writer.into_response()
}

/// Buffers one response and enforces the single-commit rule.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit `status`. Returns false if a status was already committed.
    pub fn write_header(&mut self, status: StatusCode) -> bool {
        if self.status.is_some() {
            return false;
        }
        self.status = Some(status);
        true
    }

    /// Append to the body, committing 200 if nothing was committed yet.
    pub fn write(&mut self, bytes: &[u8]) {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(bytes);
    }

    pub fn header_written(&self) -> bool {
        self.status.is_some()
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Response headers. Edits after the status is committed still apply,
    /// since nothing leaves the buffer before the handler returns.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Finish the response. An untouched writer becomes an empty 200.
    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}
