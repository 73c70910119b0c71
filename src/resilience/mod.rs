//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request through HttpClient:
//!     → retries.rs (classify the attempt outcome against the policy's rule)
//!     → backoff.rs (delay before the next attempt)
//!     → wait races the caller's CallContext; cancellation wins
//! ```
//!
//! # Design Decisions
//! - The retry rule is resolved once when the policy is built, never per call
//! - A custom predicate fully replaces the status set, transport errors included
//! - Backoff is deterministic so schedules are reproducible in tests

pub mod backoff;
pub mod retries;

pub use retries::{AttemptOutcome, RetryPolicy, RetryRule, DEFAULT_RETRY_STATUSES};
