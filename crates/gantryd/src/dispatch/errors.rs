//! Error types for request dispatch.

use std::io;

use gantry_http::HttpError;
use thiserror::Error;

/// Reasons a job was refused admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AdmissionRejected {
    /// Every worker is busy and the pending queue is full.
    #[error("worker pool is saturated ({limit} items pending)")]
    Saturated { limit: usize },
    /// The dispatcher no longer accepts work.
    #[error("worker pool is shutting down")]
    ShuttingDown,
}

/// Failures raised while handling a single connection.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The request could not be read or parsed.
    #[error("failed to read request: {0}")]
    Read(#[from] HttpError),
    /// The response could not be written.
    #[error("failed to write response: {0}")]
    Write(#[source] io::Error),
    /// The connection could not be closed cleanly.
    #[error("failed to close connection: {0}")]
    Close(#[source] io::Error),
    /// The handler panicked.
    #[error("handler panicked: {message}")]
    Panicked { message: String },
}
