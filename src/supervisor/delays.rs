//! Per-phase timeout windows.

use std::time::Duration;

/// Timeout windows for the phases of one request.
///
/// Every window is optional; an absent window means no timer for that phase.
/// A bare duration (or millisecond count) converts into the request window
/// only, which is the legacy single-timeout form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeoutDelays {
    /// Time allowed from attach until a socket is connected.
    pub connect: Option<Duration>,
    /// Maximum silence on a connected socket.
    pub socket: Option<Duration>,
    /// End-to-end watchdog from attach until the exchange ends.
    pub request: Option<Duration>,
}

impl TimeoutDelays {
    /// No windows at all.
    pub const NONE: Self = Self {
        connect: None,
        socket: None,
        request: None,
    };

    pub fn with_connect(mut self, window: Duration) -> Self {
        self.connect = Some(window);
        self
    }

    pub fn with_socket(mut self, window: Duration) -> Self {
        self.socket = Some(window);
        self
    }

    pub fn with_request(mut self, window: Duration) -> Self {
        self.request = Some(window);
        self
    }

    /// Build from millisecond values, as found in config files.
    pub fn from_millis(connect: Option<u64>, socket: Option<u64>, request: Option<u64>) -> Self {
        Self {
            connect: connect.map(Duration::from_millis),
            socket: socket.map(Duration::from_millis),
            request: request.map(Duration::from_millis),
        }
    }

    /// Returns true if no window is configured.
    pub fn is_empty(&self) -> bool {
        self.connect.is_none() && self.socket.is_none() && self.request.is_none()
    }

    /// Overlay `other` on top of `self`; windows set in `other` win.
    pub fn merge(self, other: Self) -> Self {
        Self {
            connect: other.connect.or(self.connect),
            socket: other.socket.or(self.socket),
            request: other.request.or(self.request),
        }
    }
}

impl From<Duration> for TimeoutDelays {
    fn from(request: Duration) -> Self {
        Self::NONE.with_request(request)
    }
}

impl From<u64> for TimeoutDelays {
    fn from(request_ms: u64) -> Self {
        Duration::from_millis(request_ms).into()
    }
}
