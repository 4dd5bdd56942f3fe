//! Supervision phases.
//!
//! ```text
//! Idle ──attach──▶ AwaitingSocket ──socket(connecting)──▶ Connecting
//!                        │                                    │
//!                        └──socket(connected)──▶ SocketActive ◀┘ connect
//!
//! any non-terminal ──end──▶ Completed
//! any non-terminal ──error / timeout──▶ Failed
//! ```

use std::fmt;

/// Where a supervised request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Supervisor created but not attached.
    Idle,
    /// Attached, no socket assigned yet.
    AwaitingSocket,
    /// Socket assigned and still connecting.
    Connecting,
    /// Socket connected; idle window may be armed.
    SocketActive,
    /// The exchange ended.
    Completed,
    /// The exchange errored or timed out.
    Failed,
}

impl Phase {
    /// Terminal phases never arm or fire timers again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::AwaitingSocket => "awaiting_socket",
            Phase::Connecting => "connecting",
            Phase::SocketActive => "socket_active",
            Phase::Completed => "completed",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}
