//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (startup, single-threaded):
//!     Router::get/post/... (method, path, handler)
//!     → wrap handler: Context + error translation
//!     → middleware.rs (fold in-scope middleware, first registered outermost)
//!     → shared route table (axum mux + ordered route log)
//!
//! Request:
//!     axum mux (pattern match)
//!     → middleware chain → handler → envelope on error
//! ```
//!
//! # Design Decisions
//! - Pattern matching is delegated to axum; the route log is for display only
//! - Groups share the route table but copy the middleware list
//! - Routes are frozen into an axum::Router once registration is done

pub mod middleware;
pub mod router;

pub use middleware::{compose, Endpoint, Middleware, Next};
pub use router::{HandlerResult, RouteEntry, Router, INTERNAL_ERROR_MESSAGE};
