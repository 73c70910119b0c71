//! Process lifecycle.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → every subscriber wakes → server stops accepting and drains
//! ```
//!
//! # Design Decisions
//! - One broadcast channel fans shutdown out to every long-running task
//! - The trigger is latched: triggering twice is harmless and late waiters
//!   resolve at once

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::wait_for_signal;
