//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a lightway service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener and request limits.
    pub server: ServerConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Outbound HTTP client pool and timeouts.
    pub http_client: HttpClientConfig,

    /// Outbound retry behaviour.
    pub retry: RetryConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Token issuance and verification keys.
    pub jwt: JwtConfig,

    /// Telegram notifications.
    pub telegram: TelegramConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error).
    pub log_level: String,

    /// Log format ("text" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Outbound HTTP client configuration. Zero values mean "use the default".
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Idle connections kept per host.
    pub max_idle_per_host: usize,

    /// How long an idle connection stays pooled, in seconds.
    pub idle_timeout_secs: u64,

    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 10,
            idle_timeout_secs: 90,
            timeout_secs: 60,
            connect_timeout_secs: 10,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries.
    pub enabled: bool,

    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// HTTP statuses worth retrying.
    pub retry_on: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
            retry_on: vec![429, 502, 503, 504],
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins; "*" allows any origin.
    pub allowed_origins: Vec<String>,

    /// Methods advertised to the browser.
    pub allowed_methods: Vec<String>,

    /// Non-simple request headers the browser may send.
    pub allowed_headers: Vec<String>,

    /// Response headers exposed to scripts.
    pub exposed_headers: Vec<String>,

    /// Allow cookies and auth headers on cross-origin requests.
    pub allow_credentials: bool,

    /// Preflight cache duration in seconds.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                .map(String::from)
                .to_vec(),
            allowed_headers: ["Origin", "Content-Type", "Authorization", "Accept"]
                .map(String::from)
                .to_vec(),
            exposed_headers: Vec::new(),
            allow_credentials: true,
            max_age_secs: 24 * 60 * 60,
        }
    }
}

/// JWT configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JwtConfig {
    /// RSA private key (PEM) used to sign tokens.
    pub private_key_path: Option<String>,

    /// RSA public key (PEM) used to verify tokens.
    pub public_key_path: Option<String>,

    /// Token lifetime in hours.
    pub expires_in_hours: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            private_key_path: None,
            public_key_path: None,
            expires_in_hours: 24,
        }
    }
}

/// Telegram notifier configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub token: String,
    pub chat_id: String,
}
