//! Response representation and serialisation.

use std::io::{self, Write};

use crate::status::{STATUS_OK, reason_phrase};

/// An HTTP response.
///
/// Serialisation writes a status line and headers followed by the body.
/// [`Response::without_http_headers`] drops the transport framing so only the
/// body reaches the sink, which is what non-network callers want.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    chunked: bool,
    http_headers: bool,
}

impl Response {
    /// Creates an empty response with the given status.
    #[must_use]
    pub const fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
            chunked: false,
            http_headers: true,
        }
    }

    /// Creates an empty `200 OK` response.
    #[must_use]
    pub const fn ok() -> Self {
        Self::new(STATUS_OK)
    }

    /// Creates a plain-text error response whose body is `message`.
    #[must_use]
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self::new(status)
            .with_header("Content-Type", "text/plain; charset=utf-8")
            .with_body(message.into())
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replaces the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Requests chunked transfer framing.
    #[must_use]
    pub fn chunked(mut self) -> Self {
        self.chunked = true;
        self
    }

    /// Falls back to `Content-Length` framing.
    pub const fn no_chunk(&mut self) {
        self.chunked = false;
    }

    /// Drops the status line and headers from serialisation.
    pub const fn without_http_headers(&mut self) {
        self.http_headers = false;
    }

    /// Numeric status.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Whether the status is the canonical success status.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    /// First header named `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Response body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Whether the status line and headers will be written.
    #[must_use]
    pub const fn has_http_headers(&self) -> bool {
        self.http_headers
    }

    /// Whether the body will use chunked framing.
    #[must_use]
    pub const fn is_chunked(&self) -> bool {
        self.chunked && self.http_headers
    }

    /// Serialises the response into `out` and flushes it.
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        if self.http_headers {
            self.write_head(out)?;
        }
        if self.is_chunked() {
            if !self.body.is_empty() {
                write!(out, "{:x}\r\n", self.body.len())?;
                out.write_all(&self.body)?;
                out.write_all(b"\r\n")?;
            }
            out.write_all(b"0\r\n\r\n")?;
        } else {
            out.write_all(&self.body)?;
        }
        out.flush()
    }

    fn write_head<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        write!(
            out,
            "HTTP/1.1 {} {}\r\n",
            self.status,
            reason_phrase(self.status)
        )?;
        for (name, value) in &self.headers {
            write!(out, "{name}: {value}\r\n")?;
        }
        if self.chunked {
            out.write_all(b"Transfer-Encoding: chunked\r\n")?;
        } else {
            write!(out, "Content-Length: {}\r\n", self.body.len())?;
        }
        out.write_all(b"Connection: close\r\n\r\n")
    }
}
