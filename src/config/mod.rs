//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated)
//!     → CLI flags override timeouts/retries
//!     → Client::from_config
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - `timeouts` accepts a bare number (request window) or a per-phase table
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::ClientConfig;
pub use schema::DEFAULT_MAX_BODY_BYTES;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use schema::PhaseTimeouts;
pub use schema::RetryConfig;
pub use schema::TimeoutSetting;
