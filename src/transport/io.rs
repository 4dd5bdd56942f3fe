//! Socket activity tracking and the idle-timeout primitive.
//!
//! # Responsibilities
//! - Observe read/write progress on the connection
//! - Fire an idle event after a configurable window of silence
//! - Tie helper tasks to the lifetime of the exchange that spawned them

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;

use crate::supervisor::LifecycleEvent;

/// Wraps a socket and signals `activity` whenever bytes move.
#[derive(Debug)]
pub struct ActivityStream<S> {
    inner: S,
    activity: Arc<Notify>,
}

impl<S> ActivityStream<S> {
    pub fn new(inner: S, activity: Arc<Notify>) -> Self {
        Self { inner, activity }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for ActivityStream<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let poll = Pin::new(&mut self.inner).poll_read(cx, buf);
        if matches!(poll, Poll::Ready(Ok(()))) && buf.filled().len() > before {
            self.activity.notify_one();
        }
        poll
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for ActivityStream<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let poll = Pin::new(&mut self.inner).poll_write(cx, buf);
        if matches!(poll, Poll::Ready(Ok(n)) if n > 0) {
            self.activity.notify_one();
        }
        poll
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Wait for `window` of silence, then report [`LifecycleEvent::IdleTimeout`].
///
/// The window comes from `idle` and may be installed or changed at any time;
/// until one is set the watcher just waits. Each activity signal restarts the
/// countdown. Returns after reporting, or once `idle` or `events` close.
pub async fn watch_idle(
    mut idle: watch::Receiver<Option<Duration>>,
    activity: Arc<Notify>,
    events: mpsc::UnboundedSender<LifecycleEvent>,
) {
    loop {
        let window = *idle.borrow_and_update();
        let Some(window) = window else {
            if idle.changed().await.is_err() {
                return;
            }
            continue;
        };

        tokio::select! {
            changed = idle.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            _ = activity.notified() => {}
            _ = tokio::time::sleep(window) => {
                tracing::debug!(window = ?window, "Socket idle window elapsed");
                let _ = events.send(LifecycleEvent::IdleTimeout);
                return;
            }
        }
    }
}

/// Aborts the wrapped task when dropped.
#[derive(Debug)]
pub struct TaskGuard(JoinHandle<()>);

impl TaskGuard {
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self(tokio::spawn(future))
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}
