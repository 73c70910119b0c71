//! Middleware composition.
//!
//! A middleware turns the next endpoint into a new endpoint. Chains are built
//! by folding right to left, so the first middleware in a list runs first and
//! wraps everything after it.

use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use futures_util::future::BoxFuture;

/// A request-to-response function at some point in the chain.
pub type Endpoint = Arc<dyn Fn(Request<Body>) -> BoxFuture<'static, Response> + Send + Sync>;

/// The rest of the chain, handed to a middleware.
pub struct Next {
    endpoint: Endpoint,
}

impl Next {
    /// Run the remaining middleware and the handler.
    pub async fn run(self, req: Request<Body>) -> Response {
        (*self.endpoint)(req).await
    }
}

/// A decorator over an [`Endpoint`].
#[derive(Clone)]
pub struct Middleware {
    wrap: Arc<dyn Fn(Endpoint) -> Endpoint + Send + Sync>,
}

impl Middleware {
    /// Middleware from a raw endpoint transform.
    pub fn new<F>(wrap: F) -> Self
    where
        F: Fn(Endpoint) -> Endpoint + Send + Sync + 'static,
    {
        Self {
            wrap: Arc::new(wrap),
        }
    }

    /// Middleware from an async function of the request and the rest of the
    /// chain. Not calling `next.run` short-circuits the chain.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Request<Body>, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let f = Arc::new(f);
        Self::new(move |endpoint: Endpoint| {
            let f = f.clone();
            Arc::new(move |req: Request<Body>| -> BoxFuture<'static, Response> {
                let next = Next {
                    endpoint: endpoint.clone(),
                };
                Box::pin((*f)(req, next))
            })
        })
    }

    /// Wrap `next` with this middleware.
    pub fn wrap(&self, next: Endpoint) -> Endpoint {
        (*self.wrap)(next)
    }
}

impl std::fmt::Debug for Middleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Middleware(..)")
    }
}

/// Wrap `endpoint` so that `middlewares[0]` runs first.
pub fn compose(middlewares: &[Middleware], endpoint: Endpoint) -> Endpoint {
    middlewares
        .iter()
        .rev()
        .fold(endpoint, |next, middleware| middleware.wrap(next))
}
