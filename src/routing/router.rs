//! Route registration and dispatch.
//!
//! # Responsibilities
//! - Register handlers per method and path on a shared axum mux
//! - Wrap each handler with its in-scope middleware and error translation
//! - Keep an ordered log of registered routes for display
//!
//! # Design Decisions
//! - The table is only written during startup; `into_axum` freezes it
//! - A group copies its parent's middleware, so later additions stay local
//! - Unknown handler errors are logged and masked behind a fixed 500 message

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::routing::{on, MethodFilter};
use futures_util::future::BoxFuture;
use tower::ServiceExt;

use crate::error::{find_app_error, BoxError};
use crate::http::Context;
use crate::observability::Logger;
use crate::routing::middleware::{compose, Endpoint, Middleware};

/// What a handler returns. Any error type converts with `?`.
pub type HandlerResult = Result<(), BoxError>;

/// Envelope message for errors that are not `AppError`.
pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

const ANSI_GREEN: &str = "\x1b[32m";
const ANSI_WHITE: &str = "\x1b[37m";
const ANSI_BLUE: &str = "\x1b[34m";
const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_RED: &str = "\x1b[31m";
const ANSI_PURPLE: &str = "\x1b[35m";
const ANSI_RESET: &str = "\x1b[0m";

/// A registered route, as shown by `print_routes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub method: Method,
    pub path: String,
}

#[derive(Default)]
struct RouteTable {
    mux: axum::Router,
    routes: Vec<RouteEntry>,
}

/// Router with path-prefix groups and scoped middleware.
pub struct Router {
    table: Arc<Mutex<RouteTable>>,
    prefix: String,
    middlewares: Vec<Middleware>,
    logger: Logger,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(RouteTable::default())),
            prefix: String::new(),
            middlewares: Vec::new(),
            logger: Logger::current(),
        }
    }

    /// Logger used for masked handler errors and handed to each `Context`.
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Child router under `prefix`. Shares the route table; gets its own
    /// copy of the current middleware list.
    pub fn group(&self, prefix: &str) -> Router {
        Router {
            table: Arc::clone(&self.table),
            prefix: format!("{}{}", self.prefix, prefix),
            middlewares: self.middlewares.clone(),
            logger: self.logger.clone(),
        }
    }

    /// Add middleware for routes registered on this router (and groups
    /// created from it) from now on.
    pub fn use_middleware(&mut self, middleware: Middleware) -> &mut Self {
        self.middlewares.push(middleware);
        self
    }

    /// Register `handler` for `method` and `path` under this router's prefix.
    ///
    /// # Panics
    ///
    /// Panics if `method` is not one axum can route, or if the path conflicts
    /// with an existing route (the mux rejects overlapping registrations).
    pub fn handle<F>(&self, method: Method, path: &str, handler: F)
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        let filter = match MethodFilter::try_from(method.clone()) {
            Ok(filter) => filter,
            Err(_) => panic!("cannot route method {method}"),
        };

        let handler = Arc::new(handler);
        let logger = self.logger.clone();
        let inner: Endpoint = Arc::new(move |req: Request<Body>| -> BoxFuture<'static, Response> {
            let handler = Arc::clone(&handler);
            let logger = logger.clone();
            Box::pin(async move {
                let mut ctx = Context::from_request(req, logger.clone()).await;
                if let Err(err) = (*handler)(&mut ctx).await {
                    translate_error(&mut ctx, err, &logger);
                }
                ctx.into_response()
            })
        });
        let endpoint = compose(&self.middlewares, inner);

        let path = display_path(&self.prefix, path);
        let mut table = self.lock_table();
        table.routes.push(RouteEntry {
            method,
            path: path.clone(),
        });
        let mux = std::mem::take(&mut table.mux);
        table.mux = mux.route(
            &path,
            on(filter, move |req: Request<Body>| {
                let endpoint = Arc::clone(&endpoint);
                async move { (*endpoint)(req).await }
            }),
        );
    }

    pub fn get<F>(&self, path: &str, handler: F)
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.handle(Method::GET, path, handler);
    }

    pub fn post<F>(&self, path: &str, handler: F)
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.handle(Method::POST, path, handler);
    }

    pub fn put<F>(&self, path: &str, handler: F)
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.handle(Method::PUT, path, handler);
    }

    pub fn delete<F>(&self, path: &str, handler: F)
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.handle(Method::DELETE, path, handler);
    }

    pub fn options<F>(&self, path: &str, handler: F)
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.handle(Method::OPTIONS, path, handler);
    }

    /// Registered routes in registration order, across all groups.
    pub fn routes(&self) -> Vec<RouteEntry> {
        self.lock_table().routes.clone()
    }

    /// Render the route log, one `[Router] METHOD path` line per route.
    pub fn write_routes<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for route in self.lock_table().routes.iter() {
            let method_color = if route.method == Method::POST || route.method == Method::PUT {
                ANSI_YELLOW
            } else if route.method == Method::DELETE {
                ANSI_RED
            } else if route.method == Method::OPTIONS {
                ANSI_PURPLE
            } else {
                ANSI_GREEN
            };
            writeln!(
                out,
                "{}[Router] {}{:<7}{} {}{}{}",
                color(ANSI_WHITE),
                color(method_color),
                route.method.as_str(),
                color(ANSI_RESET),
                color(ANSI_BLUE),
                route.path,
                color(ANSI_RESET),
            )?;
        }
        Ok(())
    }

    pub fn print_routes(&self) {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        if let Err(err) = self.write_routes(&mut lock) {
            self.logger
                .in_scope(|| tracing::warn!(error = %err, "printing routes failed"));
        }
    }

    /// Freeze the shared table into an axum router. Call once, after every
    /// group has finished registering.
    pub fn into_axum(self) -> axum::Router {
        let mux = std::mem::take(&mut self.lock_table().mux);
        mux
    }

    /// Freeze the table and wrap the whole router with outer middleware,
    /// first listed running first.
    pub fn with_middleware<I>(self, middlewares: I) -> axum::Router
    where
        I: IntoIterator<Item = Middleware>,
    {
        let mux = self.into_axum();
        let inner: Endpoint = Arc::new(move |req: Request<Body>| -> BoxFuture<'static, Response> {
            let mux = mux.clone();
            Box::pin(async move {
                match mux.oneshot(req).await {
                    Ok(response) => response,
                    Err(never) => match never {},
                }
            })
        });
        let middlewares: Vec<Middleware> = middlewares.into_iter().collect();
        let endpoint = compose(&middlewares, inner);

        axum::Router::new().fallback(move |req: Request<Body>| {
            let endpoint = Arc::clone(&endpoint);
            async move { (*endpoint)(req).await }
        })
    }

    fn lock_table(&self) -> MutexGuard<'_, RouteTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn display_path(prefix: &str, path: &str) -> String {
    let full = format!("{prefix}{path}");
    if full.is_empty() {
        "/".to_string()
    } else {
        full
    }
}

/// Escape code, or nothing when colours are disabled (`NO_COLOR`, `TERM=dumb`).
fn color(code: &'static str) -> &'static str {
    let no_color = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
    let dumb = std::env::var("TERM").is_ok_and(|term| term == "dumb");
    if no_color || dumb {
        ""
    } else {
        code
    }
}

fn translate_error(ctx: &mut Context, err: BoxError, logger: &Logger) {
    if ctx.header_written() {
        return;
    }

    match find_app_error(err.as_ref()) {
        Some(app) => ctx.json_response(app.code, (), Some(&app.message)),
        None => {
            logger.in_scope(|| {
                tracing::error!(
                    method = %ctx.method(),
                    path = %ctx.uri().path(),
                    error = %err,
                    "unhandled handler error"
                )
            });
            ctx.json_response(
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                (),
                Some(INTERNAL_ERROR_MESSAGE),
            );
        }
    }
}
