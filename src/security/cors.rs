//! Cross-origin resource sharing.
//!
//! # Responsibilities
//! - Decide whether a request origin is allowed
//! - Answer preflight requests without reaching the handler
//! - Decorate actual responses with the allow headers
//!
//! # Design Decisions
//! - The origin rule is resolved once, at construction, into a tagged rule
//! - A predicate replaces the origin list entirely
//! - `*` allows any non-empty origin; the echoed value is the request origin
//! - Headers the handler already set are left alone

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_MAX_AGE, ORIGIN,
    VARY,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::config::CorsConfig;
use crate::observability::Logger;
use crate::routing::{Middleware, Next};

const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// How an origin is checked.
#[derive(Clone)]
pub enum OriginRule {
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
    List { any: bool, origins: HashSet<String> },
}

impl OriginRule {
    fn from_list<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let origins: HashSet<String> = origins
            .into_iter()
            .map(|origin| origin.as_ref().trim().to_string())
            .collect();
        OriginRule::List {
            any: origins.contains("*"),
            origins,
        }
    }

    pub fn allows(&self, origin: &str) -> bool {
        match self {
            OriginRule::Predicate(allow) => allow(origin),
            OriginRule::List { any, origins } => {
                (*any && !origin.is_empty()) || origins.contains(origin)
            }
        }
    }
}

impl fmt::Debug for OriginRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginRule::Predicate(_) => f.write_str("Predicate(..)"),
            OriginRule::List { any, origins } => f
                .debug_struct("List")
                .field("any", any)
                .field("origins", origins)
                .finish(),
        }
    }
}

/// Resolved CORS settings.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    rule: OriginRule,
    methods: Option<HeaderValue>,
    headers: Option<HeaderValue>,
    exposed: Option<HeaderValue>,
    allow_credentials: bool,
    max_age: Duration,
    logger: Logger,
}

impl CorsPolicy {
    pub fn from_config(config: &CorsConfig) -> Self {
        let defaults = CorsConfig::default();
        let methods = if config.allowed_methods.is_empty() {
            &defaults.allowed_methods
        } else {
            &config.allowed_methods
        };
        let headers = if config.allowed_headers.is_empty() {
            &defaults.allowed_headers
        } else {
            &config.allowed_headers
        };
        let max_age = match config.max_age_secs {
            0 => DEFAULT_MAX_AGE,
            secs => Duration::from_secs(secs),
        };

        Self {
            rule: OriginRule::from_list(&config.allowed_origins),
            methods: join_header(methods),
            headers: join_header(headers),
            exposed: join_header(&config.exposed_headers),
            allow_credentials: config.allow_credentials,
            max_age,
            logger: Logger::current(),
        }
    }

    /// Decide origins with `allow` instead of the origin list.
    pub fn allow_origin_if<F>(mut self, allow: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.rule = OriginRule::Predicate(Arc::new(allow));
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn rule(&self) -> &OriginRule {
        &self.rule
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.rule.allows(origin)
    }

    fn apply(&self, headers: &mut HeaderMap, origin: HeaderValue, preflight: bool) {
        set_default(headers, ACCESS_CONTROL_ALLOW_ORIGIN, Some(origin));
        set_default(headers, ACCESS_CONTROL_ALLOW_METHODS, self.methods.clone());
        set_default(headers, ACCESS_CONTROL_ALLOW_HEADERS, self.headers.clone());
        if self.allow_credentials {
            set_default(
                headers,
                ACCESS_CONTROL_ALLOW_CREDENTIALS,
                Some(HeaderValue::from_static("true")),
            );
        }
        if preflight && !self.max_age.is_zero() {
            set_default(
                headers,
                ACCESS_CONTROL_MAX_AGE,
                Some(HeaderValue::from(self.max_age.as_secs())),
            );
        }
        set_default(headers, ACCESS_CONTROL_EXPOSE_HEADERS, self.exposed.clone());
    }
}

/// Allow every origin, without credentials.
pub fn default_policy() -> CorsPolicy {
    let config = CorsConfig {
        allowed_origins: vec!["*".to_string()],
        allow_credentials: false,
        ..CorsConfig::default()
    };
    CorsPolicy::from_config(&config)
}

/// Policy for a comma-separated origin list, other settings at defaults.
pub fn from_origins(origins: &str) -> CorsPolicy {
    let config = CorsConfig {
        allowed_origins: origins.split(',').map(String::from).collect(),
        ..CorsConfig::default()
    };
    CorsPolicy::from_config(&config)
}

/// CORS middleware for `policy`.
pub fn cors(policy: CorsPolicy) -> Middleware {
    let policy = Arc::new(policy);
    Middleware::from_fn(move |req: Request<Body>, next: Next| {
        let policy = Arc::clone(&policy);
        async move {
            let origin = req.headers().get(ORIGIN).cloned();
            let origin_str = origin
                .as_ref()
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
                .to_owned();
            let allowed = policy.is_allowed(&origin_str);

            let mut response = if req.method() == Method::OPTIONS {
                if allowed {
                    let mut response = StatusCode::NO_CONTENT.into_response();
                    if let Some(origin) = origin {
                        policy.apply(response.headers_mut(), origin, true);
                    }
                    response
                } else {
                    policy
                        .logger
                        .in_scope(|| tracing::warn!(origin = %origin_str, "CORS forbidden"));
                    StatusCode::FORBIDDEN.into_response()
                }
            } else {
                let mut response: Response = next.run(req).await;
                if let (true, Some(origin)) = (allowed, origin) {
                    policy.apply(response.headers_mut(), origin, false);
                }
                response
            };

            response
                .headers_mut()
                .append(VARY, HeaderValue::from_static("Origin"));
            response
        }
    })
}

fn join_header(values: &[String]) -> Option<HeaderValue> {
    if values.is_empty() {
        return None;
    }
    HeaderValue::from_str(&values.join(", ")).ok()
}

fn set_default(headers: &mut HeaderMap, name: HeaderName, value: Option<HeaderValue>) {
    if let Some(value) = value {
        headers.entry(name).or_insert(value);
    }
}
