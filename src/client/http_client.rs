//! JSON HTTP client with optional retry.
//!
//! # Responsibilities
//! - Send a JSON-encoded request and return the raw response body
//! - Retry transient failures with exponential backoff when a policy is set
//! - Bound every wait by the caller's `CallContext`
//!
//! # Design Decisions
//! - Without a policy a call is exactly one attempt
//! - A status below 400 ends the call successfully on any attempt
//! - Exhaustion wraps the last failure; cancellation is reported separately
//! - Clones share the underlying connection pool

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, HOST};
use reqwest::Method;
use serde::Serialize;

use crate::client::context::CallContext;
use crate::client::error::ClientError;
use crate::config::HttpClientConfig;
use crate::http::response::APPLICATION_JSON;
use crate::observability::{metrics, Logger};
use crate::resilience::{AttemptOutcome, RetryPolicy};

/// Result of one attempt that did not end the call.
enum Step {
    Done(Bytes),
    Retry(ClientError),
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    retry: Option<Arc<RetryPolicy>>,
    logger: Logger,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Client with default pool settings and no retry.
    ///
    /// If the tuned builder fails the error is logged and reqwest's plain
    /// client is used instead.
    ///
    /// # Panics
    ///
    /// Panics when reqwest's plain client cannot be built either, as
    /// `reqwest::Client::new` does when the TLS backend fails to initialise.
    pub fn new() -> Self {
        Self::or_plain(Self::with_config(&HttpClientConfig::default()), Logger::current())
    }

    fn or_plain(built: Result<Self, ClientError>, logger: Logger) -> Self {
        match built {
            Ok(client) => client,
            Err(err) => {
                logger.in_scope(|| {
                    tracing::warn!(error = %err, "falling back to default reqwest client")
                });
                Self::from_client(reqwest::Client::new()).with_logger(logger)
            }
        }
    }

    /// Client with pool sizing and timeouts from configuration. Zero values
    /// fall back to defaults.
    pub fn with_config(config: &HttpClientConfig) -> Result<Self, ClientError> {
        let defaults = HttpClientConfig::default();
        let or_default = |value: u64, default: u64| if value == 0 { default } else { value };
        let max_idle = match config.max_idle_per_host {
            0 => defaults.max_idle_per_host,
            n => n,
        };

        let inner = reqwest::Client::builder()
            .pool_max_idle_per_host(max_idle)
            .pool_idle_timeout(Duration::from_secs(or_default(
                config.idle_timeout_secs,
                defaults.idle_timeout_secs,
            )))
            .timeout(Duration::from_secs(or_default(
                config.timeout_secs,
                defaults.timeout_secs,
            )))
            .connect_timeout(Duration::from_secs(or_default(
                config.connect_timeout_secs,
                defaults.connect_timeout_secs,
            )))
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self::from_client(inner))
    }

    pub fn from_client(inner: reqwest::Client) -> Self {
        Self {
            inner,
            retry: None,
            logger: Logger::current(),
        }
    }

    /// Copy of this client that retries under `policy`. The pool is shared.
    pub fn with_retry(&self, policy: RetryPolicy) -> Self {
        Self {
            inner: self.inner.clone(),
            retry: Some(Arc::new(policy)),
            logger: self.logger.clone(),
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn retry_policy(&self) -> Option<&RetryPolicy> {
        self.retry.as_deref()
    }

    /// Send a pre-built request once. No retry, no status classification.
    pub async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response, reqwest::Error> {
        self.inner.execute(request).await
    }

    /// Send `body` as JSON and return the response body.
    ///
    /// A header named `Host` (any case) sets the request's host instead of
    /// being added as an ordinary header.
    pub async fn request_bytes<B, I, K, V>(
        &self,
        ctx: &CallContext,
        method: Method,
        url: &str,
        body: &B,
        headers: I,
    ) -> Result<Bytes, ClientError>
    where
        B: Serialize + ?Sized,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let payload = Bytes::from(serde_json::to_vec(body)?);
        let headers = build_headers(headers)?;
        let max_attempts = self.retry.as_ref().map_or(1, |policy| policy.max_attempts());

        let mut last_body: Option<Bytes> = None;
        let mut attempt: u32 = 0;
        loop {
            if attempt > 0 {
                self.wait_before_retry(ctx, url, attempt, max_attempts, &last_body)
                    .await?;
            }

            let failure = match self
                .attempt(ctx, &method, url, &headers, &payload, &mut last_body)
                .await?
            {
                Step::Done(body) => return Ok(body),
                Step::Retry(failure) => failure,
            };

            attempt += 1;
            if attempt >= max_attempts {
                self.logger.in_scope(|| {
                    tracing::error!(url = %url, attempts = max_attempts, "all retry attempts exhausted")
                });
                metrics::record_exhausted();
                return Err(ClientError::Exhausted {
                    attempts: max_attempts,
                    last: Box::new(failure),
                    body: last_body,
                });
            }
        }
    }

    async fn wait_before_retry(
        &self,
        ctx: &CallContext,
        url: &str,
        attempt: u32,
        max_attempts: u32,
        last_body: &Option<Bytes>,
    ) -> Result<(), ClientError> {
        let delay = self
            .retry
            .as_ref()
            .map_or(Duration::ZERO, |policy| policy.backoff(attempt - 1));
        self.logger.in_scope(|| {
            tracing::warn!(
                url = %url,
                attempt = attempt + 1,
                max_attempts,
                delay = ?delay,
                "retrying request"
            )
        });
        metrics::record_retry();

        tokio::select! {
            reason = ctx.done() => Err(ClientError::Cancelled { reason, body: last_body.clone() }),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    async fn attempt(
        &self,
        ctx: &CallContext,
        method: &Method,
        url: &str,
        headers: &HeaderMap,
        payload: &Bytes,
        last_body: &mut Option<Bytes>,
    ) -> Result<Step, ClientError> {
        if let Some(reason) = ctx.err() {
            return Err(ClientError::Cancelled {
                reason,
                body: last_body.clone(),
            });
        }

        let request = self
            .inner
            .request(method.clone(), url)
            .headers(headers.clone())
            .body(payload.clone())
            .build()
            .map_err(ClientError::Build)?;

        let sent = tokio::select! {
            reason = ctx.done() => return Err(ClientError::Cancelled { reason, body: last_body.clone() }),
            sent = self.inner.execute(request) => sent,
        };

        let response = match sent {
            Ok(response) => response,
            Err(err) => {
                if self.is_retryable(&AttemptOutcome::Error(&err)) {
                    self.logger.in_scope(|| {
                        tracing::debug!(url = %url, error = %err, "request attempt failed")
                    });
                    return Ok(Step::Retry(ClientError::Transport(err)));
                }
                return Err(ClientError::Transport(err));
            }
        };

        let status = response.status();
        let response_headers = response.headers().clone();
        let body = tokio::select! {
            reason = ctx.done() => return Err(ClientError::Cancelled { reason, body: last_body.clone() }),
            body = response.bytes() => body.map_err(ClientError::Body)?,
        };

        if status.as_u16() < 400 {
            return Ok(Step::Done(body));
        }

        *last_body = Some(body.clone());
        let outcome = AttemptOutcome::Response {
            status,
            headers: &response_headers,
            body: &body,
        };
        if self.is_retryable(&outcome) {
            self.logger.in_scope(|| {
                tracing::warn!(url = %url, status = status.as_u16(), "retryable error")
            });
            return Ok(Step::Retry(ClientError::Status { status, body }));
        }

        self.logger.in_scope(|| {
            tracing::warn!(
                url = %url,
                status = status.as_u16(),
                body = %String::from_utf8_lossy(&body),
                "request failed"
            )
        });
        Err(ClientError::Status { status, body })
    }

    fn is_retryable(&self, outcome: &AttemptOutcome<'_>) -> bool {
        self.retry
            .as_ref()
            .is_some_and(|policy| policy.is_retryable(outcome))
    }
}

fn build_headers<I, K, V>(headers: I) -> Result<HeaderMap, ClientError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut map = HeaderMap::new();
    map.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));

    for (key, value) in headers {
        let (key, value) = (key.as_ref(), value.as_ref());
        let invalid = || ClientError::Header {
            name: key.to_string(),
        };
        let name = if key.eq_ignore_ascii_case("host") {
            HOST
        } else {
            HeaderName::from_bytes(key.as_bytes()).map_err(|_| invalid())?
        };
        let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        map.insert(name, value);
    }
    Ok(map)
}
