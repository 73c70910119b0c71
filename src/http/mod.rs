//! HTTP server-side plumbing.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (tower-http layers: request id, trace, timeout, body limit)
//!     → routing::Router (middleware chain, handler)
//!     → context.rs (params, query, body, write-once response)
//!     → response.rs (JSON envelope)
//!     → Send to client
//! ```

pub mod context;
pub mod response;
pub mod server;

pub use context::Context;
pub use response::{error_response, Envelope, ResponseWriter};
pub use server::HttpServer;
