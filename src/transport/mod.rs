//! Transport subsystem: the request/socket side of supervision.
//!
//! # Data Flow
//! ```text
//! URL
//!     → address.rs (Endpoint: TCP host:port or unix socket path)
//!     → exchange.rs (HttpExchange, supervised request)
//!         worker task: connect → SocketAssigned/SocketConnected
//!                      io.rs ActivityStream + idle watcher → IdleTimeout
//!                      hyper http1 round trip → response head
//!         body task:   body chunks → ResponseBody, then End / Error
//!         awaiting task: supervisor deadlines + lifecycle events
//! ```
//!
//! # Design Decisions
//! - One fresh connection per exchange (no pooling)
//! - Idle detection belongs to the transport; the supervisor only installs it
//! - Aborting the worker drops the connection and every helper task

pub mod address;
pub mod exchange;
pub mod io;

pub use address::{AddressError, Endpoint, Target};
pub use exchange::{FetchError, FetchResponse, HttpExchange, ResponseBody, StreamingResponse};
