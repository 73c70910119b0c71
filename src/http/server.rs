//! HTTP server setup.
//!
//! # Responsibilities
//! - Wrap an application router with the transport layers
//! - Bind to a listener and serve until shutdown
//!
//! # Design Decisions
//! - Request ids are assigned outermost so every log line can carry one
//! - Shutdown is driven by a `ShutdownSignal`; in-flight requests drain

use std::time::Duration;

use axum::http::HeaderName;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::lifecycle::ShutdownSignal;
use crate::observability::Logger;

pub const X_REQUEST_ID: &str = "x-request-id";

/// HTTP server for an application router.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
    logger: Logger,
}

impl HttpServer {
    pub fn new(config: ServerConfig, app: Router) -> Self {
        let router = Self::build_router(&config, app);
        Self {
            router,
            config,
            logger: Logger::current(),
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, app: Router) -> Router {
        let request_id = HeaderName::from_static(X_REQUEST_ID);
        app.layer(RequestBodyLimitLayer::new(config.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The fully layered router, for driving the server without a socket.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve on `listener` until `shutdown` fires, then drain.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        self.logger
            .in_scope(|| tracing::info!(address = %addr, "HTTP server starting"));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.recv())
            .await?;

        self.logger.in_scope(|| tracing::info!("HTTP server stopped"));
        Ok(())
    }
}
