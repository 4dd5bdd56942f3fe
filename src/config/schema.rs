//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML. Timeout
//! windows are in milliseconds.

use serde::{Deserialize, Serialize};

use crate::supervisor::TimeoutDelays;

/// Default upper bound on a collected or streamed response body.
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Root configuration for the client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// `User-Agent` header sent with every request.
    pub user_agent: String,

    /// Largest response body accepted, in bytes.
    pub max_body_bytes: usize,

    /// Timeout windows.
    pub timeouts: TimeoutSetting,

    /// Retry settings.
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("timed-request/", env!("CARGO_PKG_VERSION")).to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            timeouts: TimeoutSetting::default(),
            retries: RetryConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Timeout windows, either a single request window or per phase.
///
/// ```toml
/// timeouts = 1000
/// # or
/// [timeouts]
/// connect = 500
/// socket = 3000
/// request = 10000
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TimeoutSetting {
    /// Legacy form: a request window in milliseconds.
    Millis(u64),
    /// Per-phase windows.
    Phases(PhaseTimeouts),
}

impl Default for TimeoutSetting {
    fn default() -> Self {
        TimeoutSetting::Phases(PhaseTimeouts::default())
    }
}

impl From<TimeoutSetting> for TimeoutDelays {
    fn from(setting: TimeoutSetting) -> Self {
        match setting {
            TimeoutSetting::Millis(request) => TimeoutDelays::from(request),
            TimeoutSetting::Phases(phases) => {
                TimeoutDelays::from_millis(phases.connect, phases.socket, phases.request)
            }
        }
    }
}

/// Per-phase timeout windows in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PhaseTimeouts {
    /// Until the socket is connected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect: Option<u64>,

    /// Maximum silence on a connected socket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket: Option<u64>,

    /// Whole exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<u64>,
}

/// Retry configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries allowed after a timed-out attempt (0 disables retries).
    pub limit: u32,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter directive (trace, debug, info, warn, error, or EnvFilter syntax).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn scalar_timeout_is_request_window() {
        let config: ClientConfig = toml::from_str("timeouts = 1000").unwrap();
        assert_eq!(config.timeouts, TimeoutSetting::Millis(1000));
        let delays = TimeoutDelays::from(config.timeouts);
        assert_eq!(delays, TimeoutDelays::NONE.with_request(Duration::from_millis(1000)));
    }

    #[test]
    fn table_timeout_keeps_phases() {
        let config: ClientConfig = toml::from_str(
            r#"
            [timeouts]
            socket = 500
            request = 1000
            "#,
        )
        .unwrap();
        let delays = TimeoutDelays::from(config.timeouts);
        assert_eq!(delays, TimeoutDelays::from_millis(None, Some(500), Some(1000)));
    }

    #[test]
    fn unknown_phase_is_rejected() {
        let result: Result<ClientConfig, _> = toml::from_str(
            r#"
            [timeouts]
            conect = 500
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert!(TimeoutDelays::from(config.timeouts).is_empty());
        assert_eq!(config.retries.limit, 0);
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
        assert!(config.user_agent.starts_with("timed-request/"));
    }

    #[test]
    fn body_limit_is_top_level() {
        let config: ClientConfig = toml::from_str(
            r#"
            max_body_bytes = 4096
            timeouts = 1000
            "#,
        )
        .unwrap();
        assert_eq!(config.max_body_bytes, 4096);
    }

    #[test]
    fn json_log_format() {
        let config: ClientConfig = toml::from_str(
            r#"
            [observability]
            log_level = "debug"
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.observability.log_level, "debug");
    }
}
