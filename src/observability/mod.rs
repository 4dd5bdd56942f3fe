//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! supervisor + transport + client produce:
//!     → logging.rs (structured log events, exchange spans)
//!     → metrics.rs (counters, histograms)
//! ```
//!
//! # Design Decisions
//! - Every exchange runs in a span carrying its UUID `exchange_id`
//! - Timeouts are logged at warn with host and kind
//! - Metrics go through the `metrics` facade; the embedding application
//!   chooses the exporter

pub mod logging;
pub mod metrics;
