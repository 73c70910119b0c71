//! Demo application wired from configuration.
//!
//! # Routes
//! ```text
//! GET    /health                 liveness
//! POST   /api/v1/echo            echo a JSON body back
//! GET    /api/v1/users/{id}      user lookup (id 1 and 2 exist)
//! POST   /api/v1/token           issue a token (jwt.private_key_path set)
//! GET    /api/v1/me              authenticated caller (jwt.public_key_path set)
//! POST   /api/v1/notify          send a Telegram message (telegram.enabled)
//! ```
//!
//! The root router carries the access log and CORS; `/api/v1/me` adds bearer
//! auth for itself only.

use std::path::Path;
use std::sync::Arc;

use axum::http::StatusCode;
use futures_util::future::BoxFuture;
use jsonwebtoken::EncodingKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::{ClientError, HttpClient};
use crate::config::AppConfig;
use crate::error::{AppError, BoxError};
use crate::http::Context;
use crate::notifier::{Notifier, TelegramNotifier};
use crate::observability::{access_log, Logger};
use crate::routing::{HandlerResult, Router};
use crate::security::cors::{self, CorsPolicy};
use crate::security::jwt::{self, Claims, JwtError};
use crate::security::require_auth;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Jwt(#[from] JwtError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct User {
    id: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct TokenRequest {
    user_id: i64,
    username: String,
    #[serde(default = "default_role")]
    role: String,
}

fn default_role() -> String {
    "user".to_string()
}

#[derive(Debug, Deserialize)]
struct NotifyRequest {
    message: String,
}

/// Build the demo router. Nothing is frozen yet, so callers can still
/// print routes or add groups.
pub fn build_router(config: &AppConfig, logger: Logger) -> Result<Router, StartupError> {
    let mut root = Router::new().with_logger(logger.clone());
    root.use_middleware(access_log(logger.clone()));

    let policy = if config.cors.allowed_origins.is_empty() {
        cors::default_policy()
    } else {
        CorsPolicy::from_config(&config.cors)
    };
    root.use_middleware(cors::cors(policy.with_logger(logger.clone())));

    root.get("/health", health);

    let api = root.group("/api/v1");
    api.post("/echo", echo);
    api.get("/users/{id}", get_user);

    if let Some(path) = &config.jwt.private_key_path {
        let key = Arc::new(jwt::load_encoding_key(Path::new(path))?);
        let hours = config.jwt.expires_in_hours;
        api.post("/token", move |c| {
            let key = Arc::clone(&key);
            Box::pin(async move { issue_token(c, &key, hours).await })
        });
    }

    if let Some(path) = &config.jwt.public_key_path {
        let key = Arc::new(jwt::load_decoding_key(Path::new(path))?);
        let mut me = api.group("/me");
        me.use_middleware(require_auth(key));
        me.get("", whoami);
    }

    if config.telegram.enabled {
        let client = HttpClient::with_config(&config.http_client)?.with_logger(logger);
        let notifier: Arc<dyn Notifier> =
            Arc::new(TelegramNotifier::from_config(client, &config.telegram));
        api.post("/notify", move |c| {
            let notifier = Arc::clone(&notifier);
            Box::pin(async move { notify(c, notifier.as_ref()).await })
        });
    }

    Ok(root)
}

fn health(c: &mut Context) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        c.json_response(StatusCode::OK, serde_json::json!({"status": "ok"}), None);
        Ok(())
    })
}

fn echo(c: &mut Context) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        let body: serde_json::Value = c.bind_json().await?;
        c.json_response(StatusCode::OK, body, None);
        Ok(())
    })
}

fn get_user(c: &mut Context) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        let id = c.param_int("id")?;
        let user = match id {
            1 => User { id, name: "ada".into() },
            2 => User { id, name: "grace".into() },
            _ => return Err(BoxError::from(AppError::not_found("user not found"))),
        };
        c.json_response(StatusCode::OK, user, None);
        Ok(())
    })
}

async fn issue_token(c: &mut Context, key: &EncodingKey, hours: u64) -> HandlerResult {
    let req: TokenRequest = c.bind_json().await?;
    let token = jwt::generate_token(key, req.user_id, &req.username, &req.role, hours)?;
    c.json_response(StatusCode::OK, serde_json::json!({"token": token}), None);
    Ok(())
}

fn whoami(c: &mut Context) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        let user_id = c.user_id()?;
        let claims = c.extensions().get::<Claims>().cloned();
        c.json_response(
            StatusCode::OK,
            serde_json::json!({"user_id": user_id, "claims": claims}),
            None,
        );
        Ok(())
    })
}

async fn notify(c: &mut Context, notifier: &dyn Notifier) -> HandlerResult {
    let req: NotifyRequest = c.bind_json().await?;
    if req.message.trim().is_empty() {
        return Err(AppError::new(StatusCode::BAD_REQUEST, "message is empty", None).into());
    }
    notifier.send(&req.message).await?;
    c.status(StatusCode::NO_CONTENT);
    Ok(())
}
