//! Timeout supervision for outbound HTTP requests.
//!
//! A request can stall while connecting, while idle on an open socket, or
//! while waiting for a response. The supervisor arms a timer per phase and
//! turns a stall into one of two errors: `ConnectionTimedOut` or
//! `SocketResponseTimedOut`.

pub mod client;
pub mod config;
pub mod observability;
pub mod supervisor;
pub mod transport;

pub use client::Client;
pub use config::ClientConfig;
pub use supervisor::{attach, TimeoutDelays, TimeoutError, TimeoutKind};
pub use transport::{FetchError, FetchResponse, HttpExchange, ResponseBody, StreamingResponse};
