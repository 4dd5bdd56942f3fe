//! Request target parsing, including unix-socket addresses.
//!
//! Accepted forms:
//! - `http://host[:port]/path?query`
//! - `http://unix:/path/to/socket:/request/path`
//! - `unix:/path/to/socket:/request/path`
//!
//! The socket path ends at the first `:` after `unix:`, so request paths may
//! themselves contain colons.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

const UNIX_PREFIXES: [&str; 2] = ["http://unix:", "unix:"];
const UNIX_HOST: &str = "localhost";

/// Errors produced while parsing a request target.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid URL '{url}': {reason}")]
    Invalid { url: String, reason: String },

    #[error("unsupported scheme '{0}' (only http is supported)")]
    UnsupportedScheme(String),

    #[error("URL '{0}' has no host")]
    MissingHost(String),

    #[error("unix socket address '{0}' must look like unix:<socket>:<path>")]
    MalformedUnix(String),
}

/// Where the transport connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// TCP `host:port`.
    Tcp { host: String, port: u16 },
    /// Unix domain socket path.
    Unix { socket_path: PathBuf },
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Tcp { host, port } => write!(f, "{}:{}", host, port),
            Target::Unix { socket_path } => write!(f, "unix:{}", socket_path.display()),
        }
    }
}

/// A parsed request target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Transport address.
    pub target: Target,
    /// Origin-form request target (`/path?query`).
    pub path_and_query: String,
    /// Value for the `Host` header.
    pub host_header: String,
}

impl Endpoint {
    /// Parse a URL or unix-socket address.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let input = input.trim();
        for prefix in UNIX_PREFIXES {
            if let Some(rest) = input.strip_prefix(prefix) {
                return Self::parse_unix(input, rest);
            }
        }
        Self::parse_http(input)
    }

    fn parse_unix(input: &str, rest: &str) -> Result<Self, AddressError> {
        let (socket_path, path) = rest
            .split_once(':')
            .ok_or_else(|| AddressError::MalformedUnix(input.to_string()))?;

        if socket_path.is_empty() || path.is_empty() {
            return Err(AddressError::MalformedUnix(input.to_string()));
        }

        let path_and_query = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        Ok(Self {
            target: Target::Unix {
                socket_path: PathBuf::from(socket_path),
            },
            path_and_query,
            host_header: UNIX_HOST.to_string(),
        })
    }

    fn parse_http(input: &str) -> Result<Self, AddressError> {
        let url = Url::parse(input).map_err(|e| AddressError::Invalid {
            url: input.to_string(),
            reason: e.to_string(),
        })?;

        if url.scheme() != "http" {
            return Err(AddressError::UnsupportedScheme(url.scheme().to_string()));
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| AddressError::MissingHost(input.to_string()))?
            .to_string();
        let port = url.port_or_known_default().unwrap_or(80);

        let host_header = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.clone(),
        };

        let mut path_and_query = url.path().to_string();
        if let Some(query) = url.query() {
            path_and_query.push('?');
            path_and_query.push_str(query);
        }

        // `Url` keeps IPv6 hosts bracketed; connect wants them bare.
        let host = host.trim_start_matches('[').trim_end_matches(']').to_string();

        Ok(Self {
            target: Target::Tcp { host, port },
            path_and_query,
            host_header,
        })
    }
}
