//! The timeout-supervision state machine.
//!
//! The supervisor does no I/O and never sleeps. It is told about lifecycle
//! events and about the passage of time, and answers with at most one
//! [`Directive`] for the request to carry out.

use tokio::time::Instant;

use super::delays::TimeoutDelays;
use super::error::{TimeoutError, TimeoutKind};
use super::phase::Phase;
use super::request::{Directive, LifecycleEvent, SocketState};
use super::timer::{earliest, PhaseTimer};

/// Timers and phase for one supervised request.
#[derive(Debug, Clone)]
pub struct TimeoutSupervisor {
    delays: TimeoutDelays,
    phase: Phase,
    connect_timer: PhaseTimer,
    request_timer: PhaseTimer,
    host: Option<String>,
}

impl TimeoutSupervisor {
    pub fn new(delays: TimeoutDelays) -> Self {
        Self {
            delays,
            phase: Phase::Idle,
            connect_timer: PhaseTimer::default(),
            request_timer: PhaseTimer::default(),
            host: None,
        }
    }

    /// Arm the connect and request windows. Only valid from `Idle`.
    pub fn start(&mut self, host: Option<String>, now: Instant) {
        if self.phase != Phase::Idle {
            tracing::debug!(phase = %self.phase, "Supervisor already started");
            return;
        }

        self.host = host;
        if let Some(window) = self.delays.connect {
            self.connect_timer.arm(now, window);
        }
        if let Some(window) = self.delays.request {
            self.request_timer.arm(now, window);
        }
        self.phase = Phase::AwaitingSocket;

        tracing::debug!(
            host = self.host.as_deref().unwrap_or("-"),
            connect = ?self.delays.connect,
            socket = ?self.delays.socket,
            request = ?self.delays.request,
            "Timeout supervision attached"
        );
    }

    /// Handle one lifecycle event.
    pub fn on_event(&mut self, event: LifecycleEvent) -> Option<Directive> {
        if self.phase.is_terminal() || self.phase == Phase::Idle {
            return None;
        }

        match event {
            LifecycleEvent::SocketAssigned(state) => self.on_socket_assigned(state),
            LifecycleEvent::SocketConnected => self.on_socket_connected(),
            LifecycleEvent::IdleTimeout => self.on_idle_timeout(),
            LifecycleEvent::End => self.on_end(),
            LifecycleEvent::Error => self.on_error(),
        }
    }

    /// Fire whichever deadline is due at `now`.
    ///
    /// `socket` is the request's socket status at the moment of expiry; it
    /// decides how a request-window expiry is classified.
    pub fn on_expiry(&mut self, now: Instant, socket: SocketState) -> Option<Directive> {
        if self.phase.is_terminal() {
            return None;
        }

        if self.connect_timer.is_due(now) {
            return Some(self.fail(TimeoutKind::ConnectionTimedOut));
        }

        if self.request_timer.is_due(now) {
            self.connect_timer.clear();
            let kind = match socket {
                SocketState::Connected => TimeoutKind::SocketResponseTimedOut,
                SocketState::Connecting | SocketState::Unassigned => TimeoutKind::ConnectionTimedOut,
            };
            return Some(self.fail(kind));
        }

        None
    }

    /// Earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        earliest(self.connect_timer.deadline(), self.request_timer.deadline())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn delays(&self) -> &TimeoutDelays {
        &self.delays
    }

    pub fn has_connect_timer(&self) -> bool {
        self.connect_timer.is_armed()
    }

    pub fn has_request_timer(&self) -> bool {
        self.request_timer.is_armed()
    }

    fn on_socket_assigned(&mut self, state: SocketState) -> Option<Directive> {
        if self.phase != Phase::AwaitingSocket {
            return None;
        }

        // A pooled socket may arrive already connected.
        if state == SocketState::Connected {
            return self.on_socket_connected_now();
        }
        self.phase = Phase::Connecting;
        None
    }

    fn on_socket_connected(&mut self) -> Option<Directive> {
        if self.phase != Phase::Connecting {
            return None;
        }
        self.on_socket_connected_now()
    }

    fn on_socket_connected_now(&mut self) -> Option<Directive> {
        if self.connect_timer.clear() {
            tracing::debug!("Connect window cleared");
        }
        self.phase = Phase::SocketActive;
        self.delays.socket.map(Directive::ArmIdleTimeout)
    }

    fn on_idle_timeout(&mut self) -> Option<Directive> {
        if self.phase != Phase::SocketActive {
            return None;
        }
        Some(self.fail(TimeoutKind::SocketResponseTimedOut))
    }

    fn on_end(&mut self) -> Option<Directive> {
        self.clear_timers();
        self.phase = Phase::Completed;
        None
    }

    fn on_error(&mut self) -> Option<Directive> {
        self.clear_timers();
        self.phase = Phase::Failed;
        None
    }

    fn fail(&mut self, kind: TimeoutKind) -> Directive {
        self.clear_timers();
        self.phase = Phase::Failed;

        tracing::warn!(
            host = self.host.as_deref().unwrap_or("-"),
            kind = %kind,
            "Request timed out"
        );
        Directive::Abort(TimeoutError::new(kind, self.host.clone()))
    }

    fn clear_timers(&mut self) {
        self.connect_timer.clear();
        self.request_timer.clear();
    }
}
