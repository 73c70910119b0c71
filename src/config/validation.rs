//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and cross-field constraints
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AppConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("retry.max_delay_ms ({max}) is lower than retry.base_delay_ms ({base})")]
    DelayRange { base: u64, max: u64 },

    #[error("retry.retry_on: {0} is not an HTTP error status")]
    RetryStatus(u16),

    #[error("observability.log_format: expected \"text\" or \"json\", got {0:?}")]
    LogFormat(String),

    #[error("telegram: enabled without {0}")]
    TelegramMissing(&'static str),
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "server.bind_address",
            value: config.server.bind_address.clone(),
        });
    }

    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: obs.metrics_address.clone(),
        });
    }
    let format = obs.log_format.trim().to_ascii_lowercase();
    if format != "text" && format != "json" {
        errors.push(ValidationError::LogFormat(obs.log_format.clone()));
    }

    let retry = &config.retry;
    if retry.base_delay_ms > 0 && retry.max_delay_ms > 0 && retry.max_delay_ms < retry.base_delay_ms {
        errors.push(ValidationError::DelayRange {
            base: retry.base_delay_ms,
            max: retry.max_delay_ms,
        });
    }
    for code in &retry.retry_on {
        if !(400..=599).contains(code) {
            errors.push(ValidationError::RetryStatus(*code));
        }
    }

    let telegram = &config.telegram;
    if telegram.enabled {
        if telegram.token.is_empty() {
            errors.push(ValidationError::TelegramMissing("token"));
        }
        if telegram.chat_id.is_empty() {
            errors.push(ValidationError::TelegramMissing("chat_id"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&AppConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AppConfig::default();
        config.retry.base_delay_ms = 2_000;
        config.retry.max_delay_ms = 1_000;
        config.retry.retry_on = vec![503, 200];
        config.telegram.enabled = true;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::DelayRange { base: 2_000, max: 1_000 },
                ValidationError::RetryStatus(200),
                ValidationError::TelegramMissing("token"),
                ValidationError::TelegramMissing("chat_id"),
            ]
        );
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = AppConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            errors[0],
            ValidationError::InvalidAddress { field: "observability.metrics_address", .. }
        ));
    }

    #[test]
    fn test_log_format_case_insensitive() {
        let mut config = AppConfig::default();
        config.observability.log_format = " JSON ".into();
        assert!(validate_config(&config).is_ok());
    }
}
