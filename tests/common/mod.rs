//! Shared mock backends for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start a backend on an ephemeral port that waits `delay` after reading
/// the request head, then answers `200 OK` with `body`.
pub async fn start_slow_backend(delay: Duration, body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        if read_head(&mut socket).await.is_none() {
                            return;
                        }
                        tokio::time::sleep(delay).await;
                        let _ = respond(&mut socket, 200, body).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a backend that sends the response head and `first` right away,
/// stalls for `stall`, then sends `rest`.
pub async fn start_stalling_backend(
    stall: Duration,
    first: &'static str,
    rest: &'static str,
) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        if read_head(&mut socket).await.is_none() {
                            return;
                        }
                        let head = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            first.len() + rest.len(),
                            first
                        );
                        if socket.write_all(head.as_bytes()).await.is_err() {
                            return;
                        }
                        tokio::time::sleep(stall).await;
                        let _ = socket.write_all(rest.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a backend on a unix socket that answers each request with its
/// request-target and records the targets it has seen.
#[cfg(unix)]
pub async fn start_unix_backend(path: &Path) -> Arc<Mutex<Vec<String>>> {
    let listener = tokio::net::UnixListener::bind(path).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = seen.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let recorded = recorded.clone();
                    tokio::spawn(async move {
                        let Some(head) = read_head(&mut socket).await else {
                            return;
                        };
                        let target = head
                            .lines()
                            .next()
                            .and_then(|line| line.split_whitespace().nth(1))
                            .unwrap_or_default()
                            .to_string();
                        recorded.lock().unwrap().push(target.clone());
                        let _ = respond(&mut socket, 200, &target).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    seen
}

async fn read_head<S: AsyncRead + Unpin>(socket: &mut S) -> Option<String> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut buf).await.ok()?;
        if n == 0 {
            return None;
        }
        head.extend_from_slice(&buf[..n]);
    }
    Some(String::from_utf8_lossy(&head).into_owned())
}

async fn respond<S: AsyncWrite + Unpin>(socket: &mut S, status: u16, body: &str) -> std::io::Result<()> {
    let status_text = match status {
        200 => "200 OK",
        404 => "404 Not Found",
        _ => "500 Internal Server Error",
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_text,
        body.len(),
        body
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}
