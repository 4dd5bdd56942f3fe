//! The contract between the supervisor and the request it watches.

use std::time::Duration;

use super::error::TimeoutError;
use super::machine::TimeoutSupervisor;

/// Connection status of the socket underlying a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SocketState {
    /// No socket has been assigned yet.
    #[default]
    Unassigned,
    /// A socket exists and its handshake is in progress.
    Connecting,
    /// The socket is connected.
    Connected,
}

/// Lifecycle notifications a request reports to its supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A socket was assigned; carries its status at assignment time.
    SocketAssigned(SocketState),
    /// The assigned socket finished connecting.
    SocketConnected,
    /// The transport's idle window elapsed without socket activity.
    IdleTimeout,
    /// The exchange completed.
    End,
    /// The transport reported an error.
    Error,
}

/// What the supervisor asks its request to do after an event or expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Install the transport's idle timeout.
    ArmIdleTimeout(Duration),
    /// Abort the transport, then report this error.
    Abort(TimeoutError),
}

/// A request handle that can be placed under timeout supervision.
pub trait SupervisedRequest {
    /// The supervision slot. `Some` doubles as the supervision marker.
    fn supervisor(&self) -> Option<&TimeoutSupervisor>;

    fn supervisor_mut(&mut self) -> &mut Option<TimeoutSupervisor>;

    /// Target host for error messages, when known.
    fn host(&self) -> Option<&str>;

    /// Status of the assigned socket right now.
    fn socket_state(&self) -> SocketState;

    /// Fire [`LifecycleEvent::IdleTimeout`] after `window` without socket activity.
    fn set_idle_timeout(&mut self, window: Duration);

    /// Tear down the underlying transport.
    fn abort(&mut self);

    /// Deliver an error through the request's normal error channel.
    fn emit_error(&mut self, error: TimeoutError);
}
