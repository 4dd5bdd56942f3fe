//! Timeout supervision for a single outbound request.
//!
//! # Data Flow
//! ```text
//! attach(request, delays)
//!     → machine.rs arms connect/request deadlines (timer.rs)
//!
//! transport lifecycle event
//!     → dispatch() → TimeoutSupervisor::on_event → Directive
//!
//! earliest deadline reached
//!     → expire() → TimeoutSupervisor::on_expiry(socket state) → Directive
//!
//! Directive::ArmIdleTimeout → request.set_idle_timeout
//! Directive::Abort(err)     → request.abort, then request.emit_error(err)
//! ```
//!
//! # Design Decisions
//! - The supervisor lives inside the request; `Some` in its slot is the
//!   supervision marker, so attaching twice is a no-op
//! - Two error kinds only: `ConnectionTimedOut` and `SocketResponseTimedOut`
//! - Transport errors clear supervision and pass through untouched
//! - First abort wins; later expiries on a failed request are no-ops

pub mod delays;
pub mod error;
pub mod machine;
pub mod phase;
pub mod request;
pub mod timer;

pub use delays::TimeoutDelays;
pub use error::{TimeoutError, TimeoutKind};
pub use machine::TimeoutSupervisor;
pub use phase::Phase;
pub use request::{Directive, LifecycleEvent, SocketState, SupervisedRequest};

use tokio::time::Instant;

use crate::observability::metrics;

/// Place `request` under timeout supervision.
///
/// Arms the connect and request windows immediately. If the request already
/// carries a supervisor this does nothing. Returns the request for chaining.
pub fn attach<R>(request: &mut R, delays: impl Into<TimeoutDelays>) -> &mut R
where
    R: SupervisedRequest + ?Sized,
{
    if request.supervisor().is_some() {
        tracing::debug!(host = request.host().unwrap_or("-"), "Request already supervised");
        return request;
    }

    let mut supervisor = TimeoutSupervisor::new(delays.into());
    supervisor.start(request.host().map(str::to_owned), Instant::now());
    *request.supervisor_mut() = Some(supervisor);
    request
}

/// Feed a lifecycle event to the request's supervisor.
pub fn dispatch<R>(request: &mut R, event: LifecycleEvent)
where
    R: SupervisedRequest + ?Sized,
{
    let directive = match request.supervisor_mut() {
        Some(supervisor) => supervisor.on_event(event),
        None => return,
    };
    apply(request, directive);
}

/// Fire any supervisor deadline that is due at `now`.
pub fn expire<R>(request: &mut R, now: Instant)
where
    R: SupervisedRequest + ?Sized,
{
    let socket = request.socket_state();
    let directive = match request.supervisor_mut() {
        Some(supervisor) => supervisor.on_expiry(now, socket),
        None => return,
    };
    apply(request, directive);
}

/// Earliest pending deadline of the request's supervisor.
pub fn next_deadline<R>(request: &R) -> Option<Instant>
where
    R: SupervisedRequest + ?Sized,
{
    request.supervisor().and_then(TimeoutSupervisor::next_deadline)
}

fn apply<R>(request: &mut R, directive: Option<Directive>)
where
    R: SupervisedRequest + ?Sized,
{
    match directive {
        None => {}
        Some(Directive::ArmIdleTimeout(window)) => {
            tracing::debug!(window = ?window, "Arming socket idle timeout");
            request.set_idle_timeout(window);
        }
        Some(Directive::Abort(error)) => {
            metrics::record_timeout(error.kind());
            request.abort();
            request.emit_error(error);
        }
    }
}
