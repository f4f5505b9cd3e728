//! Error types
//!
//! Only conditions that callers must act on are errors. Transient socket
//! conditions (would-block, resets before any data) are reported through
//! [`crate::server::Cycle`] instead.

use thiserror::Error;

/// Failure to turn received bytes into a [`crate::http::Request`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Request line has fewer than three whitespace-separated parts
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),

    /// Header line without a `:` separator
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    /// Request head is not valid UTF-8
    #[error("request head is not valid UTF-8")]
    InvalidEncoding,

    /// `Content-Length` is present but not a decimal integer
    #[error("invalid Content-Length: {0:?}")]
    InvalidContentLength(String),
}

/// Failure to compile a route rule
#[derive(Debug, Error)]
pub enum RouteError {
    /// `*` may only appear as the last segment of a rule
    #[error("wildcard must be the final segment in rule {0:?}")]
    WildcardNotLast(String),

    /// `<>` or a placeholder with characters outside `[A-Za-z0-9_]`
    #[error("invalid variable segment {segment:?} in rule {rule:?}")]
    InvalidVariable { rule: String, segment: String },

    /// The underlying pattern engine rejected the compiled pattern
    #[error("failed to compile rule {rule:?}: {source}")]
    Pattern {
        rule: String,
        #[source]
        source: regex::Error,
    },
}

/// Failure reported by a handler
///
/// The dispatcher turns this into a response carrying `status`
/// (500 when unset) and closes the connection.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    pub status: Option<u16>,
    pub message: String,
}

impl HandlerError {
    /// Internal failure, answered with 500
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// Failure answered with a specific status code
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Fatal failure of the serving entrypoint
#[derive(Debug, Error)]
pub enum ServeError {
    /// Listener failed to accept for a reason other than would-block
    #[error("failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),

    /// Listener could not be switched to non-blocking mode
    #[error("failed to configure listener: {0}")]
    Listener(#[source] std::io::Error),
}
