//! Bearer-token authentication middleware.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Request, StatusCode};
use jsonwebtoken::DecodingKey;

use crate::http::error_response;
use crate::routing::{Middleware, Next};
use crate::security::jwt::{validate_token, UserId};

/// Reject requests without a valid RS256 bearer token. On success the
/// request carries `UserId` and `Claims` extensions.
pub fn require_auth(key: Arc<DecodingKey>) -> Middleware {
    Middleware::from_fn(move |mut req: Request<Body>, next: Next| {
        let key = Arc::clone(&key);
        async move {
            let claims = match extract_bearer(req.headers()).map(|token| validate_token(&key, token)) {
                Some(Ok(claims)) => claims,
                Some(Err(err)) => {
                    tracing::debug!(error = %err, "rejected bearer token");
                    return error_response(StatusCode::UNAUTHORIZED, "unauthorized");
                }
                None => return error_response(StatusCode::UNAUTHORIZED, "unauthorized"),
            };

            req.extensions_mut().insert(UserId(claims.user_id));
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
    })
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let token = headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?
        .trim();
    (!token.is_empty()).then_some(token)
}
