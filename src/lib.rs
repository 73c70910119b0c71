//! lightway: backend HTTP building blocks.
//!
//! # Architecture Overview
//!
//! ```text
//!     Inbound                                         Outbound
//!     ───────                                         ────────
//!     http::HttpServer (tower-http layers)            client::HttpClient
//!         → routing::Router                               → resilience::RetryPolicy
//!             → middleware chain (access log,             → backoff, CallContext
//!               CORS, bearer auth)                    notifier::TelegramNotifier
//!             → handler(&mut http::Context)               → client::HttpClient
//!             → error translation → envelope
//!
//!     Cross-cutting: config, observability (Logger, metrics), error, lifecycle
//! ```

pub mod app;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod notifier;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod security;

pub use client::{CallContext, ClientError, HttpClient};
pub use config::AppConfig;
pub use error::{AppError, BoxError};
pub use http::{Context, HttpServer};
pub use lifecycle::Shutdown;
pub use routing::{Middleware, Router};
