//! Minimal HTTP/1.1 request and response model used by the Gantry pipeline.
//!
//! A [`Request`] is parsed either from the bytes of an accepted connection or
//! from a command string via [`RequestBuilder`]; both routes share the same
//! parser. A [`Response`] serialises itself with or without transport
//! framing so the same value can travel over a socket or be written to a
//! plain output sink.

mod errors;
mod request;
mod response;
mod status;

pub use errors::HttpError;
pub use request::{MAX_HEAD_BYTES, Request, RequestBuilder};
pub use response::Response;
pub use status::{STATUS_OK, reason_phrase};
