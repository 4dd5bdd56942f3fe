//! Caller-supplied retry decisions.
//!
//! The client never decides on its own whether to retry. After a failed
//! attempt it asks a [`RetryDecision`]; `Some(delay)` means "try again after
//! `delay`", `None` means "give up and return this error".

use std::time::Duration;

use crate::transport::FetchError;

/// Decides whether a failed attempt is retried.
pub trait RetryDecision {
    /// `attempt` is 1 for the first attempt.
    fn retry_after(&mut self, attempt: u32, error: &FetchError) -> Option<Duration>;
}

impl<F> RetryDecision for F
where
    F: FnMut(u32, &FetchError) -> Option<Duration>,
{
    fn retry_after(&mut self, attempt: u32, error: &FetchError) -> Option<Duration> {
        self(attempt, error)
    }
}

/// Never retry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryDecision for NoRetry {
    fn retry_after(&mut self, _attempt: u32, _error: &FetchError) -> Option<Duration> {
        None
    }
}

/// Retry timed-out attempts immediately, at most `limit` times.
#[derive(Debug, Clone, Copy)]
pub struct RetryLimit {
    limit: u32,
}

impl RetryLimit {
    pub fn new(limit: u32) -> Self {
        Self { limit }
    }
}

impl RetryDecision for RetryLimit {
    fn retry_after(&mut self, attempt: u32, error: &FetchError) -> Option<Duration> {
        if error.timeout_kind().is_some() && attempt <= self.limit {
            Some(Duration::ZERO)
        } else {
            None
        }
    }
}
