//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Components hold a Logger handle:
//!     → logging.rs (tracing dispatch built from config, text or JSON)
//!     → access_log.rs (one event per request, level by status class)
//!     → metrics.rs (counters and histograms via the metrics facade)
//!
//! Consumers:
//!     → stdout (text for development, JSON for aggregation)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Loggers are injected, not read from process-wide state
//! - A Logger without a dispatch falls back to the ambient subscriber
//! - Metric updates are no-ops until an exporter is installed

pub mod access_log;
pub mod logging;
pub mod metrics;

pub use access_log::access_log;
pub use logging::Logger;
