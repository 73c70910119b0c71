//! Per-request handler context.
//!
//! Owns the incoming request and the response buffer for exactly one request.
//! Handlers borrow it mutably; nothing in it is shared with other tasks.

use axum::body::Body;
use axum::extract::{FromRequestParts, Query, RawPathParams};
use axum::http::header::{HeaderValue, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap, Method, Request, StatusCode, Uri};
use axum::response::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::AppError;
use crate::http::response::{encode_envelope, ResponseWriter, APPLICATION_JSON};
use crate::observability::Logger;
use crate::security::UserId;

pub struct Context {
    parts: Parts,
    body: Option<Body>,
    params: Vec<(String, String)>,
    writer: ResponseWriter,
    logger: Logger,
}

impl Context {
    /// Context without path parameters.
    pub fn new(req: Request<Body>) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            parts,
            body: Some(body),
            params: Vec::new(),
            writer: ResponseWriter::new(),
            logger: Logger::current(),
        }
    }

    /// Context for a request matched by the axum router, with its path
    /// parameters captured.
    pub async fn from_request(req: Request<Body>, logger: Logger) -> Self {
        let (mut parts, body) = req.into_parts();
        let params = match RawPathParams::from_request_parts(&mut parts, &()).await {
            Ok(raw) => raw
                .iter()
                .map(|(key, value)| (key.to_owned(), value.to_owned()))
                .collect(),
            Err(_) => Vec::new(),
        };
        Self {
            parts,
            body: Some(body),
            params,
            writer: ResponseWriter::new(),
            logger,
        }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    /// Path parameter captured by a `{name}` segment.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn param_int(&self, key: &str) -> Result<i64, AppError> {
        match self.param(key) {
            None | Some("") => Err(AppError::new(
                StatusCode::BAD_REQUEST,
                "no value received",
                None,
            )),
            Some(value) => value.parse().map_err(AppError::invalid_request),
        }
    }

    /// First value of a query-string key.
    pub fn query(&self, key: &str) -> Option<String> {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&self.parts.uri).ok()?;
        pairs
            .into_iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    /// Integer query value, or `default` when absent or malformed.
    pub fn query_int(&self, key: &str, default: i64) -> i64 {
        self.query(key)
            .and_then(|value| value.parse().ok())
            .unwrap_or(default)
    }

    /// Read the body as JSON. The body can only be read once.
    pub async fn bind_json<T: DeserializeOwned>(&mut self) -> Result<T, AppError> {
        let body = self
            .body
            .take()
            .ok_or_else(|| AppError::invalid_request("request body already consumed"))?;
        let bytes = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(AppError::invalid_request)?;
        serde_json::from_slice(&bytes).map_err(AppError::invalid_request)
    }

    /// User id placed on the request by the auth middleware.
    pub fn user_id(&self) -> Result<i64, AppError> {
        self.parts
            .extensions
            .get::<UserId>()
            .map(|id| id.0)
            .ok_or_else(|| AppError::unauthorized("user id not found in context"))
    }

    /// Commit a status. Ignored if one is already committed.
    pub fn status(&mut self, status: StatusCode) {
        self.writer.write_header(status);
    }

    /// Append raw bytes, committing 200 if no status was set.
    pub fn write(&mut self, bytes: impl AsRef<[u8]>) {
        self.writer.write(bytes.as_ref());
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.writer.headers_mut()
    }

    pub fn header_written(&self) -> bool {
        self.writer.header_written()
    }

    /// Write the JSON envelope. Does nothing once a response was written.
    pub fn json_response<T: Serialize>(&mut self, status: StatusCode, data: T, error: Option<&str>) {
        if self.writer.header_written() {
            return;
        }

        self.writer
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        self.writer.write_header(status);

        match encode_envelope(status, data, error) {
            Ok(body) => self.writer.write(&body),
            Err(err) => self
                .logger
                .in_scope(|| tracing::error!(error = %err, "encoding json failed")),
        }
    }

    pub fn into_response(self) -> Response {
        self.writer.into_response()
    }
}
