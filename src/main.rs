//! timed-fetch: fetch a URL under connect, socket and request timeouts.
//!
//! ```text
//! timed-fetch --socket 500 --request 1000 http://localhost:3000/slow
//! timed-fetch --timeout 0 unix:/tmp/app.sock:/health
//! ```
//!
//! Exit status: 0 on a 2xx response, 1 on any other response, 2 when the
//! request fails (timeouts included).

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use axum::body::Bytes;
use axum::http::Method;
use clap::Parser;
use serde_json::json;

use timed_request::client::{Client, RetryLimit};
use timed_request::config::{load_config, ClientConfig};
use timed_request::observability::logging;
use timed_request::supervisor::TimeoutDelays;

#[derive(Parser)]
#[command(name = "timed-fetch")]
#[command(about = "Fetch a URL with connect, socket and request timeouts", long_about = None)]
struct Cli {
    /// URL to fetch (http://host[:port]/path or unix:<socket>:<path>)
    url: String,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Request window in milliseconds (single-timeout form)
    #[arg(short, long, value_name = "MS")]
    timeout: Option<u64>,

    /// Connect window in milliseconds
    #[arg(long, value_name = "MS")]
    connect: Option<u64>,

    /// Socket idle window in milliseconds
    #[arg(long, value_name = "MS")]
    socket: Option<u64>,

    /// Request window in milliseconds (wins over --timeout)
    #[arg(long, value_name = "MS")]
    request: Option<u64>,

    /// Retries after a timed-out attempt
    #[arg(long)]
    retries: Option<u32>,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Request body
    #[arg(short, long)]
    data: Option<String>,

    /// Print a JSON summary instead of the response body
    #[arg(long)]
    json: bool,

    /// Log filter (overrides the config file; RUST_LOG overrides both)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        config.observability.log_level = level.clone();
    }
    if let Some(limit) = cli.retries {
        config.retries.limit = limit;
    }

    logging::init(&config.observability)?;

    let overrides = TimeoutDelays::from_millis(cli.connect, cli.socket, cli.request.or(cli.timeout));
    let delays = TimeoutDelays::from(config.timeouts).merge(overrides);
    let client = Client::new(delays)
        .with_user_agent(&config.user_agent)
        .with_body_limit(config.max_body_bytes);
    let method: Method = cli.method.to_uppercase().parse()?;

    tracing::info!(
        url = %cli.url,
        method = %method,
        connect = ?delays.connect,
        socket = ?delays.socket,
        request = ?delays.request,
        retries = config.retries.limit,
        "Fetching"
    );

    let started = Instant::now();
    let result = client
        .fetch_with_retry(
            method,
            &cli.url,
            cli.data.map(Bytes::from),
            RetryLimit::new(config.retries.limit),
        )
        .await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(response) => {
            if cli.json {
                let summary = json!({
                    "status": response.status.as_u16(),
                    "bytes": response.body.len(),
                    "elapsed_ms": elapsed_ms,
                    "body": String::from_utf8_lossy(&response.body),
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(&response.body)?;
                stdout.flush()?;
            }

            if response.status.is_success() {
                Ok(ExitCode::SUCCESS)
            } else {
                tracing::warn!(status = %response.status, "Non-success status");
                Ok(ExitCode::from(1))
            }
        }
        Err(e) => {
            if cli.json {
                let summary = json!({
                    "error": e.to_string(),
                    "code": e.code(),
                    "elapsed_ms": elapsed_ms,
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            eprintln!("error: {} ({})", e, e.code());
            Ok(ExitCode::from(2))
        }
    }
}
