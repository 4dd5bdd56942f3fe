//! HTTP client issuing supervised exchanges.
//!
//! # Data Flow
//! ```text
//! Client::fetch(method, url, body)
//!     → HttpExchange::build (address parsing, Host/User-Agent headers)
//!     → supervisor::attach (fresh supervisor per attempt)
//!     → HttpExchange::send (or send_streaming for fetch_streaming)
//!     → on error: RetryDecision (caller-supplied) → sleep → next attempt
//! ```
//!
//! # Design Decisions
//! - Every attempt gets a new exchange and a new supervisor
//! - Retrying is the caller's decision; the client only asks

pub mod retry;

use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, Method, Request};

use crate::config::ClientConfig;
use crate::supervisor::{self, TimeoutDelays};
use crate::transport::{Endpoint, FetchError, FetchResponse, HttpExchange, StreamingResponse};

pub use retry::{NoRetry, RetryDecision, RetryLimit};

/// Issues requests with timeout supervision.
#[derive(Debug, Clone)]
pub struct Client {
    delays: TimeoutDelays,
    user_agent: Option<HeaderValue>,
    body_limit: usize,
}

impl Client {
    /// Client with the given timeout windows, no `User-Agent` and no body
    /// limit.
    pub fn new(delays: impl Into<TimeoutDelays>) -> Self {
        Self {
            delays: delays.into(),
            user_agent: None,
            body_limit: usize::MAX,
        }
    }

    /// Client built from a validated configuration.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.timeouts)
            .with_user_agent(&config.user_agent)
            .with_body_limit(config.max_body_bytes)
    }

    /// Fail responses whose body exceeds `limit` bytes.
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Set the `User-Agent` header. Invalid header values are ignored.
    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        match HeaderValue::from_str(user_agent) {
            Ok(value) => self.user_agent = Some(value),
            Err(_) => tracing::warn!(user_agent, "Ignoring invalid user agent"),
        }
        self
    }

    pub fn delays(&self) -> &TimeoutDelays {
        &self.delays
    }

    /// `GET url` with a single attempt.
    pub async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        self.fetch(Method::GET, url, None).await
    }

    /// One supervised attempt.
    pub async fn fetch(
        &self,
        method: Method,
        url: &str,
        body: Option<Bytes>,
    ) -> Result<FetchResponse, FetchError> {
        let mut exchange = self.exchange(method, url, body)?;
        supervisor::attach(&mut exchange, self.delays);
        exchange.send().await
    }

    /// One supervised attempt, returned at the response head. Supervision
    /// continues while the body is read.
    pub async fn fetch_streaming(
        &self,
        method: Method,
        url: &str,
        body: Option<Bytes>,
    ) -> Result<StreamingResponse, FetchError> {
        let mut exchange = self.exchange(method, url, body)?;
        supervisor::attach(&mut exchange, self.delays);
        exchange.send_streaming().await
    }

    /// Supervised attempts, repeated while `decision` asks for a retry.
    pub async fn fetch_with_retry<D>(
        &self,
        method: Method,
        url: &str,
        body: Option<Bytes>,
        mut decision: D,
    ) -> Result<FetchResponse, FetchError>
    where
        D: RetryDecision,
    {
        let mut attempt = 1;
        loop {
            let error = match self.fetch(method.clone(), url, body.clone()).await {
                Ok(response) => return Ok(response),
                Err(error) => error,
            };

            let Some(delay) = decision.retry_after(attempt, &error) else {
                return Err(error);
            };

            tracing::info!(
                url,
                attempt,
                delay = ?delay,
                error = %error,
                code = error.code(),
                "Retrying request"
            );
            if delay > Duration::ZERO {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }

    fn exchange(
        &self,
        method: Method,
        url: &str,
        body: Option<Bytes>,
    ) -> Result<HttpExchange, FetchError> {
        let endpoint = Endpoint::parse(url)?;
        let body = body.map(Body::from).unwrap_or_else(Body::empty);
        let mut builder = Request::builder().method(method).uri("/");
        if let Some(user_agent) = &self.user_agent {
            builder = builder.header(header::USER_AGENT, user_agent.clone());
        }
        Ok(HttpExchange::new(endpoint, builder.body(body)?)?.with_body_limit(self.body_limit))
    }
}
