//! Request access log.
//!
//! One event per request with method, path, status and duration. Level
//! follows the status class: info below 400, warn for 4xx, error for 5xx.

use std::time::Instant;

use axum::body::Body;
use axum::http::Request;

use crate::observability::{metrics, Logger};
use crate::routing::{Middleware, Next};

pub fn access_log(logger: Logger) -> Middleware {
    Middleware::from_fn(move |req: Request<Body>, next: Next| {
        let logger = logger.clone();
        async move {
            let start = Instant::now();
            let method = req.method().clone();
            let path = req.uri().path().to_owned();

            let response = next.run(req).await;

            let status = response.status();
            let duration = start.elapsed();
            logger.in_scope(|| {
                if status.is_server_error() {
                    tracing::error!(method = %method, path = %path, status = status.as_u16(), duration = ?duration, "http request");
                } else if status.is_client_error() {
                    tracing::warn!(method = %method, path = %path, status = status.as_u16(), duration = ?duration, "http request");
                } else {
                    tracing::info!(method = %method, path = %path, status = status.as_u16(), duration = ?duration, "http request");
                }
            });
            metrics::record_request(method.as_str(), status.as_u16(), start);

            response
        }
    })
}
