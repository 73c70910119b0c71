//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (origin check, preflight answer)
//!     → auth.rs (bearer token → UserId + Claims)
//!     → handler
//! ```
//!
//! # Design Decisions
//! - Both concerns are plain `Middleware`, scoped per router group
//! - Fail closed: a missing or invalid token never reaches the handler

pub mod auth;
pub mod cors;
pub mod jwt;

pub use auth::require_auth;
pub use cors::{cors, CorsPolicy, OriginRule};
pub use jwt::{generate_token, validate_token, Claims, JwtError, UserId};
