//! One HTTP/1.1 exchange over a fresh connection.
//!
//! # Responsibilities
//! - Connect (TCP or unix socket) and report lifecycle events
//! - Run the request/response round trip through hyper
//! - Hand the response head, then body chunks, to the caller as they arrive
//! - Drive the attached supervisor on the task awaiting the exchange
//! - Make a supervisor-raised timeout the exchange's only outcome
//!
//! # Design Decisions
//! - The supervisor stays attached until the body is read to its end, so the
//!   idle and request windows cover a streamed body as well
//! - Body chunks pass through a bounded channel; a caller that stops reading
//!   stops the socket reads too, and the idle window counts that as silence
//! - The body limit is checked as chunks are handed out

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant as StdInstant};

use axum::body::{Body, Bytes};
use axum::http::{header, response, HeaderMap, HeaderValue, Method, Request, StatusCode, Uri};
use futures_util::StreamExt;
use hyper::body::Incoming;
use hyper::client::conn::http1::SendRequest;
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::{AbortHandle, JoinError};
use tokio::time::Instant;
use tracing::{Instrument, Span};
use uuid::Uuid;

use crate::observability::metrics;
use crate::supervisor::{
    self, LifecycleEvent, SocketState, SupervisedRequest, TimeoutError, TimeoutKind,
    TimeoutSupervisor,
};
use crate::transport::address::{AddressError, Endpoint, Target};
use crate::transport::io::{watch_idle, ActivityStream, TaskGuard};

/// Body chunks buffered between the socket reader and the caller.
const CHUNK_BUFFER: usize = 16;

/// Errors an exchange can end with.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Raised by the timeout supervisor.
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("HTTP exchange failed: {0}")]
    Http(#[from] hyper::Error),

    #[error("failed to read response body: {0}")]
    Body(#[source] axum::Error),

    #[error("response body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("failed to build request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("exchange task failed: {0}")]
    Task(#[from] JoinError),
}

impl FetchError {
    /// Timeout classification, if this is a supervisor timeout.
    pub fn timeout_kind(&self) -> Option<TimeoutKind> {
        match self {
            FetchError::Timeout(err) => Some(err.kind()),
            _ => None,
        }
    }

    /// Short machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            FetchError::Timeout(err) => err.code(),
            FetchError::Address(_) => "EINVALIDURL",
            FetchError::Connect { .. } => "ECONNECT",
            FetchError::Http(_) => "EHTTP",
            FetchError::Body(_) => "EBODY",
            FetchError::BodyTooLarge { .. } => "ETOOLARGE",
            FetchError::Request(_) => "EREQUEST",
            FetchError::Task(_) => "ETASK",
        }
    }
}

/// A fully received response.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A response head whose body is still being received under supervision.
#[derive(Debug)]
pub struct StreamingResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

/// Body of a [`StreamingResponse`]. Owns the exchange, so the supervisor
/// keeps running while chunks are read.
#[derive(Debug)]
pub struct ResponseBody {
    exchange: HttpExchange,
    chunks: mpsc::Receiver<Result<Bytes, FetchError>>,
    received: usize,
    done: bool,
}

impl ResponseBody {
    /// Next chunk of the body, or `None` once the body has ended.
    ///
    /// After an error every later call returns `None`.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>, FetchError> {
        if self.done {
            return Ok(None);
        }

        let span = self.exchange.span.clone();
        let delivery = self
            .exchange
            .supervise(self.chunks.recv())
            .instrument(span)
            .await;

        let outcome = match delivery {
            Ok(Some(Ok(chunk))) => {
                self.received += chunk.len();
                if self.received <= self.exchange.body_limit {
                    return Ok(Some(chunk));
                }
                Err(FetchError::BodyTooLarge {
                    limit: self.exchange.body_limit,
                })
            }
            Ok(Some(Err(error))) | Err(error) => Err(error),
            Ok(None) => Ok(None),
        };

        self.done = true;
        if outcome.is_err() {
            self.exchange.abort();
        } else {
            tracing::debug!(
                parent: &self.exchange.span,
                bytes = self.received,
                "Response body complete"
            );
        }
        self.exchange.settle(outcome.as_ref().err());
        outcome
    }

    /// Read the remaining body into one buffer.
    pub async fn bytes(mut self) -> Result<Bytes, FetchError> {
        let mut collected = Vec::new();
        while let Some(chunk) = self.chunk().await? {
            collected.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(collected))
    }

    /// Bytes handed out so far.
    pub fn received(&self) -> usize {
        self.received
    }
}

/// A single request bound to its endpoint, ready to be supervised and sent.
pub struct HttpExchange {
    id: Uuid,
    span: Span,
    endpoint: Endpoint,
    request: Request<Body>,
    body_limit: usize,
    socket: SocketState,
    idle_tx: watch::Sender<Option<Duration>>,
    events_tx: mpsc::UnboundedSender<LifecycleEvent>,
    events: mpsc::UnboundedReceiver<LifecycleEvent>,
    worker: Option<AbortHandle>,
    failure: Option<TimeoutError>,
    started: Option<StdInstant>,
    supervisor: Option<TimeoutSupervisor>,
}

impl HttpExchange {
    /// Bind `request` to `endpoint`. The request URI is rewritten to origin
    /// form and a `Host` header is added when missing.
    pub fn new(endpoint: Endpoint, mut request: Request<Body>) -> Result<Self, FetchError> {
        *request.uri_mut() = endpoint
            .path_and_query
            .parse::<Uri>()
            .map_err(axum::http::Error::from)?;
        if !request.headers().contains_key(header::HOST) {
            let host = HeaderValue::from_str(&endpoint.host_header).map_err(axum::http::Error::from)?;
            request.headers_mut().insert(header::HOST, host);
        }

        let id = Uuid::new_v4();
        let span = tracing::debug_span!(
            "exchange",
            exchange_id = %id,
            target = %endpoint.target,
        );
        let (idle_tx, _) = watch::channel(None);
        let (events_tx, events) = mpsc::unbounded_channel();

        Ok(Self {
            id,
            span,
            endpoint,
            request,
            body_limit: usize::MAX,
            socket: SocketState::Unassigned,
            idle_tx,
            events_tx,
            events,
            worker: None,
            failure: None,
            started: None,
            supervisor: None,
        })
    }

    /// Convenience constructor for a request without headers.
    pub fn build(method: Method, url: &str, body: Body) -> Result<Self, FetchError> {
        let endpoint = Endpoint::parse(url)?;
        let request = Request::builder().method(method).uri("/").body(body)?;
        Self::new(endpoint, request)
    }

    /// Cap the response body at `limit` bytes. Unlimited by default.
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Run the exchange and collect the whole body.
    pub async fn send(self) -> Result<FetchResponse, FetchError> {
        let StreamingResponse {
            status,
            headers,
            body,
        } = self.send_streaming().await?;
        let body = body.bytes().await?;
        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }

    /// Run the exchange up to the response head. The body is read through
    /// [`ResponseBody::chunk`] with supervision still in force.
    pub async fn send_streaming(mut self) -> Result<StreamingResponse, FetchError> {
        self.started = Some(StdInstant::now());
        metrics::record_attempt();

        let span = self.span.clone();
        let started = self.start().instrument(span).await;
        match started {
            Ok((head, chunks)) => {
                tracing::debug!(parent: &self.span, status = %head.status, "Response head received");
                Ok(StreamingResponse {
                    status: head.status,
                    headers: head.headers,
                    body: ResponseBody {
                        exchange: self,
                        chunks,
                        received: 0,
                        done: false,
                    },
                })
            }
            Err(error) => {
                self.settle(Some(&error));
                Err(error)
            }
        }
    }

    async fn start(
        &mut self,
    ) -> Result<(response::Parts, mpsc::Receiver<Result<Bytes, FetchError>>), FetchError> {
        let request = std::mem::take(&mut self.request);
        let worker = tokio::spawn(
            drive(
                self.endpoint.target.clone(),
                request,
                self.events_tx.clone(),
                self.idle_tx.subscribe(),
            )
            .in_current_span(),
        );
        self.worker = Some(worker.abort_handle());

        let (head, pump) = self.supervise(worker).await???;

        let (chunks_tx, chunks) = mpsc::channel(CHUNK_BUFFER);
        let reader = tokio::spawn(
            read_body(pump, self.events_tx.clone(), chunks_tx).in_current_span(),
        );
        self.worker = Some(reader.abort_handle());
        Ok((head, chunks))
    }

    /// Await `delivery` while feeding lifecycle events and due deadlines to
    /// the supervisor. Due deadlines go first, then queued events; a raised
    /// timeout wins over anything `delivery` produces.
    async fn supervise<F>(&mut self, delivery: F) -> Result<F::Output, FetchError>
    where
        F: std::future::Future,
    {
        tokio::pin!(delivery);
        loop {
            if let Some(error) = self.failure.take() {
                return Err(FetchError::Timeout(error));
            }

            let deadline = supervisor::next_deadline(&*self);
            tokio::select! {
                biased;
                _ = sleep_until(deadline) => {
                    supervisor::expire(self, Instant::now());
                }
                Some(event) = self.events.recv() => {
                    self.observe(event);
                }
                output = &mut delivery => {
                    return Ok(output);
                }
            }
        }
    }

    fn observe(&mut self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::SocketAssigned(state) => self.socket = state,
            LifecycleEvent::SocketConnected => self.socket = SocketState::Connected,
            _ => {}
        }
        tracing::trace!(event = ?event, socket = ?self.socket, "Lifecycle event");
        supervisor::dispatch(self, event);
    }

    fn settle(&mut self, error: Option<&FetchError>) {
        if let Some(started) = self.started.take() {
            metrics::record_outcome(error, started.elapsed());
        }
    }
}

impl SupervisedRequest for HttpExchange {
    fn supervisor(&self) -> Option<&TimeoutSupervisor> {
        self.supervisor.as_ref()
    }

    fn supervisor_mut(&mut self) -> &mut Option<TimeoutSupervisor> {
        &mut self.supervisor
    }

    fn host(&self) -> Option<&str> {
        Some(&self.endpoint.host_header)
    }

    fn socket_state(&self) -> SocketState {
        self.socket
    }

    fn set_idle_timeout(&mut self, window: Duration) {
        self.idle_tx.send_replace(Some(window));
    }

    fn abort(&mut self) {
        if let Some(worker) = self.worker.take() {
            tracing::debug!(parent: &self.span, "Aborting exchange");
            worker.abort();
        }
    }

    fn emit_error(&mut self, error: TimeoutError) {
        if self.failure.is_none() {
            self.failure = Some(error);
        }
    }
}

impl Drop for HttpExchange {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

impl std::fmt::Debug for HttpExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpExchange")
            .field("id", &self.id)
            .field("target", &self.endpoint.target)
            .field("socket", &self.socket)
            .field("phase", &self.supervisor.as_ref().map(TimeoutSupervisor::phase))
            .finish()
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// A connection whose response head has arrived and whose body is unread.
struct BodyPump {
    body: Incoming,
    _sender: SendRequest<Body>,
    _connection: TaskGuard,
    _idle: TaskGuard,
}

/// Worker: connect and round-trip up to the response head.
async fn drive(
    target: Target,
    request: Request<Body>,
    events: mpsc::UnboundedSender<LifecycleEvent>,
    idle: watch::Receiver<Option<Duration>>,
) -> Result<(response::Parts, BodyPump), FetchError> {
    let outcome = connect_and_send(target, request, &events, idle).await;
    if outcome.is_err() {
        let _ = events.send(LifecycleEvent::Error);
    }
    outcome
}

async fn connect_and_send(
    target: Target,
    request: Request<Body>,
    events: &mpsc::UnboundedSender<LifecycleEvent>,
    idle: watch::Receiver<Option<Duration>>,
) -> Result<(response::Parts, BodyPump), FetchError> {
    let _ = events.send(LifecycleEvent::SocketAssigned(SocketState::Connecting));
    let connect_error = |source: io::Error| FetchError::Connect {
        target: target.to_string(),
        source,
    };

    match &target {
        Target::Tcp { host, port } => {
            let stream = TcpStream::connect((host.as_str(), *port))
                .await
                .map_err(connect_error)?;
            let _ = stream.set_nodelay(true);
            round_trip(stream, request, events, idle).await
        }
        #[cfg(unix)]
        Target::Unix { socket_path } => {
            let stream = tokio::net::UnixStream::connect(socket_path)
                .await
                .map_err(connect_error)?;
            round_trip(stream, request, events, idle).await
        }
        #[cfg(not(unix))]
        Target::Unix { .. } => Err(connect_error(io::Error::new(
            io::ErrorKind::Unsupported,
            "unix sockets are not supported on this platform",
        ))),
    }
}

async fn round_trip<S>(
    stream: S,
    request: Request<Body>,
    events: &mpsc::UnboundedSender<LifecycleEvent>,
    idle: watch::Receiver<Option<Duration>>,
) -> Result<(response::Parts, BodyPump), FetchError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let _ = events.send(LifecycleEvent::SocketConnected);
    tracing::debug!("Socket connected");

    let activity = Arc::new(Notify::new());
    let idle = TaskGuard::spawn(
        watch_idle(idle, activity.clone(), events.clone()).in_current_span(),
    );

    let io = TokioIo::new(ActivityStream::new(stream, activity));
    let (mut sender, connection) = hyper::client::conn::http1::handshake::<_, Body>(io).await?;
    let connection = TaskGuard::spawn(
        async move {
            if let Err(e) = connection.await {
                tracing::debug!(error = %e, "Connection closed with error");
            }
        }
        .in_current_span(),
    );

    let response = sender.send_request(request).await?;
    let (head, body) = response.into_parts();
    Ok((
        head,
        BodyPump {
            body,
            _sender: sender,
            _connection: connection,
            _idle: idle,
        },
    ))
}

/// Forward body chunks to the caller, then report `End` or `Error`.
async fn read_body(
    pump: BodyPump,
    events: mpsc::UnboundedSender<LifecycleEvent>,
    chunks: mpsc::Sender<Result<Bytes, FetchError>>,
) {
    let BodyPump {
        body,
        _sender,
        _connection,
        _idle,
    } = pump;
    let mut stream = Body::new(body).into_data_stream();

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(chunk) => {
                if chunks.send(Ok(chunk)).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "Response body failed");
                let _ = events.send(LifecycleEvent::Error);
                let _ = chunks.send(Err(FetchError::Body(e))).await;
                return;
            }
        }
    }
    let _ = events.send(LifecycleEvent::End);
}
