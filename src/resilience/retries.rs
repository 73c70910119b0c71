//! Retry policy.
//!
//! # Responsibilities
//! - Hold the attempt budget and backoff schedule
//! - Decide whether an attempt outcome is worth another try
//!
//! # Design Decisions
//! - Transport errors are retryable under the status-set rule
//! - A predicate rule sees every outcome and decides alone
//! - Only status codes from the configured set are retried (never 400 by default)

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};

use crate::config::RetryConfig;
use crate::resilience::backoff::calculate_backoff;

/// Statuses retried when no set or predicate is configured.
pub const DEFAULT_RETRY_STATUSES: [StatusCode; 4] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

/// What a single attempt produced.
#[derive(Debug, Clone, Copy)]
pub enum AttemptOutcome<'a> {
    /// The server answered with a status >= 400.
    Response {
        status: StatusCode,
        headers: &'a HeaderMap,
        body: &'a [u8],
    },
    /// The request never produced a response.
    Error(&'a reqwest::Error),
}

type RetryPredicate = dyn Fn(&AttemptOutcome<'_>) -> bool + Send + Sync;

/// How retryability is decided.
#[derive(Clone)]
pub enum RetryRule {
    /// Transport errors plus any response whose status is in the set.
    Statuses(Vec<StatusCode>),
    /// Caller-supplied decision for every outcome.
    Predicate(Arc<RetryPredicate>),
}

impl RetryRule {
    fn matches(&self, outcome: &AttemptOutcome<'_>) -> bool {
        match self {
            RetryRule::Predicate(predicate) => predicate(outcome),
            RetryRule::Statuses(statuses) => match outcome {
                AttemptOutcome::Error(_) => true,
                AttemptOutcome::Response { status, .. } => statuses.contains(status),
            },
        }
    }
}

impl fmt::Debug for RetryRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryRule::Statuses(statuses) => f.debug_tuple("Statuses").field(statuses).finish(),
            RetryRule::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Attempt budget, backoff schedule and retryability rule.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    rule: RetryRule,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            rule: RetryRule::Statuses(DEFAULT_RETRY_STATUSES.to_vec()),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from file configuration. Zero values fall back to defaults.
    pub fn from_config(config: &RetryConfig) -> Self {
        let mut policy = Self::default();
        if config.max_retries > 0 {
            policy.max_retries = config.max_retries;
        }
        if config.base_delay_ms > 0 {
            policy.base_delay = Duration::from_millis(config.base_delay_ms);
        }
        if config.max_delay_ms > 0 {
            policy.max_delay = Duration::from_millis(config.max_delay_ms);
        }
        let statuses: Vec<StatusCode> = config
            .retry_on
            .iter()
            .filter_map(|code| StatusCode::from_u16(*code).ok())
            .collect();
        policy.retry_on(statuses)
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Retry on these statuses (and on transport errors). An empty set
    /// restores the defaults.
    pub fn retry_on(mut self, statuses: impl IntoIterator<Item = StatusCode>) -> Self {
        let statuses: Vec<StatusCode> = statuses.into_iter().collect();
        self.rule = if statuses.is_empty() {
            RetryRule::Statuses(DEFAULT_RETRY_STATUSES.to_vec())
        } else {
            RetryRule::Statuses(statuses)
        };
        self
    }

    /// Replace the status set with a predicate. The predicate also decides
    /// for transport errors; nothing is retried unless it says so.
    pub fn retry_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&AttemptOutcome<'_>) -> bool + Send + Sync + 'static,
    {
        self.rule = RetryRule::Predicate(Arc::new(predicate));
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts, the first one included.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn rule(&self) -> &RetryRule {
        &self.rule
    }

    /// Delay before retry `attempt` (0-indexed).
    pub fn backoff(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_delay, self.max_delay)
    }

    pub fn is_retryable(&self, outcome: &AttemptOutcome<'_>) -> bool {
        self.rule.matches(outcome)
    }
}
