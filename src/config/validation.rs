//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check header-bound values are representable
//! - Check the body limit admits at least one byte
//! - Check the log filter parses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>

use axum::http::HeaderValue;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::ClientConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("user_agent must not be empty")]
    EmptyUserAgent,

    #[error("user_agent is not a valid header value")]
    InvalidUserAgent,

    #[error("max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("invalid log_level '{level}': {reason}")]
    InvalidLogLevel { level: String, reason: String },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.user_agent.trim().is_empty() {
        errors.push(ValidationError::EmptyUserAgent);
    } else if HeaderValue::from_str(&config.user_agent).is_err() {
        errors.push(ValidationError::InvalidUserAgent);
    }

    if config.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if let Err(e) = EnvFilter::try_new(&config.observability.log_level) {
        errors.push(ValidationError::InvalidLogLevel {
            level: config.observability.log_level.clone(),
            reason: e.to_string(),
        });
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
    fn default_config_is_valid() {
        assert!(validate_config(&ClientConfig::default()).is_ok());
    }

    #[test]
    fn reports_every_error() {
        let mut config = ClientConfig::default();
        config.user_agent = "  ".into();
        config.max_body_bytes = 0;
        config.observability.log_level = "timed_request=loud".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0], ValidationError::EmptyUserAgent);
        assert_eq!(errors[1], ValidationError::ZeroBodyLimit);
        assert!(matches!(errors[2], ValidationError::InvalidLogLevel { .. }));
    }

    #[test]
    fn rejects_control_characters_in_user_agent() {
        let mut config = ClientConfig::default();
        config.user_agent = "agent\nwith newline".into();
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::InvalidUserAgent]
        );
    }
}
