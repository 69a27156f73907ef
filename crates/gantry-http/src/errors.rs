//! Errors raised while reading requests.

use std::io;

use thiserror::Error;

/// Failures surfaced while parsing or building a [`crate::Request`].
#[derive(Debug, Error)]
pub enum HttpError {
    /// The peer closed the stream before sending anything.
    #[error("connection closed before a request was received")]
    EmptyRequest,
    /// The request line did not have the `METHOD target VERSION` shape.
    #[error("malformed request line: {line}")]
    MalformedRequestLine { line: String },
    /// A header line lacked a `name: value` separator.
    #[error("malformed header line: {line}")]
    MalformedHeader { line: String },
    /// `Content-Length` was not a non-negative integer.
    #[error("invalid content length: {value}")]
    InvalidContentLength { value: String },
    /// The peer closed the stream before sending the declared body.
    #[error("request body ended after {received} of {expected} bytes")]
    TruncatedBody { expected: u64, received: u64 },
    /// The request head exceeded the size limit.
    #[error("request head exceeds {limit} bytes")]
    HeadTooLarge { limit: usize },
    /// A command string was empty.
    #[error("command is empty")]
    EmptyCommand,
    /// Reading from the stream failed.
    #[error("failed to read request: {0}")]
    Io(#[from] io::Error),
}

impl HttpError {
    /// Whether the error means the peer simply went away.
    #[must_use]
    pub const fn is_disconnect(&self) -> bool {
        matches!(self, Self::EmptyRequest)
    }
}
