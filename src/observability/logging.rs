//! Structured logging.
//!
//! # Responsibilities
//! - Build a `tracing` subscriber from configuration
//! - Hand it to components as an explicit `Logger`
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, text format for development
//! - `RUST_LOG` wins over the configured level when present

use std::fmt;

use tracing::dispatcher::{self, Dispatch, SetGlobalDefaultError};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

use crate::config::ObservabilityConfig;

/// Handle to the subscriber a component should log to.
#[derive(Clone, Default)]
pub struct Logger {
    dispatch: Option<Dispatch>,
}

impl Logger {
    pub fn new(dispatch: Dispatch) -> Self {
        Self {
            dispatch: Some(dispatch),
        }
    }

    /// Log to whatever subscriber is current at the call site.
    pub fn current() -> Self {
        Self::default()
    }

    /// Run `f` with this logger's subscriber as the default.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        match &self.dispatch {
            Some(dispatch) => dispatcher::with_default(dispatch, f),
            None => f(),
        }
    }

    /// Make this logger the process default. Meant for binary startup only.
    pub fn install_global(&self) -> Result<(), SetGlobalDefaultError> {
        match &self.dispatch {
            Some(dispatch) => dispatcher::set_global_default(dispatch.clone()),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("dispatch", &self.dispatch.is_some())
            .finish()
    }
}

/// Parse a level name; unknown names mean `info`.
pub fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_ascii_lowercase().as_str() {
        "debug" => LevelFilter::DEBUG,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    }
}

fn is_json(format: &str) -> bool {
    format.trim().eq_ignore_ascii_case("json")
}

/// Logger writing to stdout.
pub fn build(config: &ObservabilityConfig) -> Logger {
    assemble(config, std::io::stdout, true)
}

/// Logger writing to a custom sink, without ANSI colours.
pub fn build_with_writer<W>(config: &ObservabilityConfig, writer: W) -> Logger
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    assemble(config, writer, false)
}

fn assemble<W>(config: &ObservabilityConfig, writer: W, ansi: bool) -> Logger
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(parse_level(&config.log_level).to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi);

    let dispatch = if is_json(&config.log_format) {
        Dispatch::new(builder.json().finish())
    } else {
        Dispatch::new(builder.finish())
    };
    Logger::new(dispatch)
}
