//! Outbound HTTP.
//!
//! # Data Flow
//! ```text
//! HttpClient::request_bytes(ctx, method, url, body, headers)
//!     → JSON-encode body once
//!     → attempt: send, read body (both raced against ctx.done())
//!     → status < 400: done
//!     → retryable per RetryPolicy: back off, try again
//!     → otherwise: ClientError with the last body
//! ```

pub mod context;
pub mod error;
pub mod http_client;

pub use context::{CallContext, CancelHandle, CancelReason};
pub use error::ClientError;
pub use http_client::HttpClient;
