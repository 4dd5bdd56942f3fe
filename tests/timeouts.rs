//! End-to-end timeout behavior against a deliberately slow backend.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::Method;
use timed_request::client::{Client, RetryLimit};
use timed_request::supervisor::{self, SupervisedRequest, TimeoutDelays};
use timed_request::{FetchError, HttpExchange, TimeoutKind};

mod common;

const SLOW: Duration = Duration::from_millis(2000);

async fn slow_url() -> String {
    let addr = common::start_slow_backend(SLOW, "slow").await;
    format!("http://{}/slow", addr)
}

fn kind_of(result: Result<timed_request::FetchResponse, FetchError>) -> TimeoutKind {
    match result {
        Ok(response) => panic!("expected a timeout, got {}", response.status),
        Err(e) => e
            .timeout_kind()
            .unwrap_or_else(|| panic!("expected a timeout, got {}", e)),
    }
}

#[tokio::test]
async fn test_zero_request_window_is_connection_timeout() {
    let url = slow_url().await;
    let err = Client::new(0u64).get(&url).await.unwrap_err();

    assert_eq!(err.timeout_kind(), Some(TimeoutKind::ConnectionTimedOut));
    assert_eq!(err.code(), "ETIMEDOUT");
}

#[tokio::test]
async fn test_request_window_on_connected_socket_is_socket_timeout() {
    let url = slow_url().await;
    let err = Client::new(1000u64).get(&url).await.unwrap_err();

    assert_eq!(err.timeout_kind(), Some(TimeoutKind::SocketResponseTimedOut));
    assert_eq!(err.code(), "ESOCKETTIMEDOUT");
}

#[tokio::test]
async fn test_request_window_before_socket_ignores_idle_window() {
    let url = slow_url().await;
    let delays = TimeoutDelays::from_millis(None, Some(3000), Some(0));

    let kind = kind_of(Client::new(delays).get(&url).await);
    assert_eq!(kind, TimeoutKind::ConnectionTimedOut);
}

#[tokio::test]
async fn test_idle_window_fires_before_request_window() {
    let url = slow_url().await;
    let delays = TimeoutDelays::from_millis(None, Some(500), Some(1000));

    let started = Instant::now();
    let kind = kind_of(Client::new(delays).get(&url).await);

    assert_eq!(kind, TimeoutKind::SocketResponseTimedOut);
    assert!(started.elapsed() < Duration::from_millis(1000));
}

#[tokio::test]
async fn test_tiny_idle_window() {
    let url = slow_url().await;
    let delays = TimeoutDelays::from_millis(None, Some(1), None);

    let kind = kind_of(Client::new(delays).get(&url).await);
    assert_eq!(kind, TimeoutKind::SocketResponseTimedOut);
}

#[tokio::test]
async fn test_request_window_record_matches_scalar() {
    let url = slow_url().await;
    let delays = TimeoutDelays::from_millis(None, None, Some(1000));

    let kind = kind_of(Client::new(delays).get(&url).await);
    assert_eq!(kind, TimeoutKind::SocketResponseTimedOut);
}

#[tokio::test]
async fn test_generous_windows_succeed() {
    let addr = common::start_slow_backend(Duration::from_millis(50), "hello").await;
    let url = format!("http://{}/fast", addr);
    let delays = TimeoutDelays::from_millis(Some(1000), Some(1000), Some(3000));

    let response = Client::new(delays).get(&url).await.unwrap();
    assert!(response.status.is_success());
    assert_eq!(&response.body[..], b"hello");
}

#[tokio::test]
async fn test_retries_keep_connection_timeout_kind() {
    let url = slow_url().await;
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    let decision = move |attempt: u32, err: &FetchError| {
        counter.fetch_add(1, Ordering::SeqCst);
        assert_eq!(err.timeout_kind(), Some(TimeoutKind::ConnectionTimedOut));
        (attempt < 3).then_some(Duration::ZERO)
    };
    let err = Client::new(0u64)
        .fetch_with_retry(Method::GET, &url, None, decision)
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(err.timeout_kind(), Some(TimeoutKind::ConnectionTimedOut));
}

#[tokio::test]
async fn test_retries_keep_socket_timeout_kind() {
    let url = slow_url().await;
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    let decision = move |attempt: u32, err: &FetchError| {
        counter.fetch_add(1, Ordering::SeqCst);
        assert_eq!(err.timeout_kind(), Some(TimeoutKind::SocketResponseTimedOut));
        (attempt < 2).then_some(Duration::ZERO)
    };
    let delays = TimeoutDelays::from_millis(None, Some(100), None);
    let err = Client::new(delays)
        .fetch_with_retry(Method::GET, &url, None, decision)
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(err.timeout_kind(), Some(TimeoutKind::SocketResponseTimedOut));
}

#[tokio::test]
async fn test_retry_limit_from_config_value() {
    let url = slow_url().await;
    let delays = TimeoutDelays::from_millis(None, Some(50), None);

    let err = Client::new(delays)
        .fetch_with_retry(Method::GET, &url, None, RetryLimit::new(2))
        .await
        .unwrap_err();
    assert_eq!(err.timeout_kind(), Some(TimeoutKind::SocketResponseTimedOut));
}

#[tokio::test]
async fn test_double_attach_keeps_first_supervisor() {
    let url = slow_url().await;
    let mut exchange = HttpExchange::build(Method::GET, &url, Body::empty()).unwrap();

    supervisor::attach(&mut exchange, TimeoutDelays::from_millis(None, Some(200), None));
    supervisor::attach(&mut exchange, 5000u64);

    let delays = *exchange.supervisor().unwrap().delays();
    assert_eq!(delays.socket, Some(Duration::from_millis(200)));
    assert_eq!(delays.request, None);

    let err = exchange.send().await.unwrap_err();
    assert_eq!(err.timeout_kind(), Some(TimeoutKind::SocketResponseTimedOut));
}

#[tokio::test]
async fn test_unsupervised_exchange_is_not_timed() {
    let addr = common::start_slow_backend(Duration::from_millis(100), "plain").await;
    let url = format!("http://{}/", addr);
    let exchange = HttpExchange::build(Method::GET, &url, Body::empty()).unwrap();

    let response = exchange.send().await.unwrap();
    assert_eq!(&response.body[..], b"plain");
}

#[tokio::test]
async fn test_streaming_request_window_is_socket_timeout() {
    let url = slow_url().await;

    let err = Client::new(500u64)
        .fetch_streaming(Method::GET, &url, None)
        .await
        .unwrap_err();
    assert_eq!(err.timeout_kind(), Some(TimeoutKind::SocketResponseTimedOut));
    assert_eq!(err.code(), "ESOCKETTIMEDOUT");
}
