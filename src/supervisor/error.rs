//! Timeout classification and error type.

use std::fmt;
use thiserror::Error;

/// Which kind of stall ended the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutKind {
    /// No usable connection within the configured window(s).
    ConnectionTimedOut,
    /// Connected, but no response or activity within the window.
    SocketResponseTimedOut,
}

impl TimeoutKind {
    /// Conventional error code for this kind.
    pub fn code(self) -> &'static str {
        match self {
            TimeoutKind::ConnectionTimedOut => "ETIMEDOUT",
            TimeoutKind::SocketResponseTimedOut => "ESOCKETTIMEDOUT",
        }
    }

    fn subject(self) -> &'static str {
        match self {
            TimeoutKind::ConnectionTimedOut => "Connection",
            TimeoutKind::SocketResponseTimedOut => "Socket",
        }
    }
}

impl fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A classified timeout raised by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} timed out on request{}", .kind.subject(), HostSuffix(.host.as_deref()))]
pub struct TimeoutError {
    kind: TimeoutKind,
    host: Option<String>,
}

impl TimeoutError {
    pub fn new(kind: TimeoutKind, host: Option<String>) -> Self {
        Self { kind, host }
    }

    pub fn kind(&self) -> TimeoutKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Target host, when it was known at attach time.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }
}

struct HostSuffix<'a>(Option<&'a str>);

impl fmt::Display for HostSuffix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(host) => write!(f, " to {}", host),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_includes_host() {
        let err = TimeoutError::new(TimeoutKind::ConnectionTimedOut, Some("example.com:8080".into()));
        assert_eq!(err.to_string(), "Connection timed out on request to example.com:8080");
        assert_eq!(err.code(), "ETIMEDOUT");
    }

    #[test]
    fn message_without_host() {
        let err = TimeoutError::new(TimeoutKind::SocketResponseTimedOut, None);
        assert_eq!(err.to_string(), "Socket timed out on request");
        assert_eq!(err.kind().to_string(), "ESOCKETTIMEDOUT");
    }
}
