//! Request parsing and the command-string builder.

use std::io::{BufRead, Read};

use percent_encoding::percent_decode_str;

use crate::errors::HttpError;

/// Upper bound on the size of the request line plus headers.
pub const MAX_HEAD_BYTES: usize = 64 * 1024;

const DEFAULT_METHOD: &str = "GET";
const HTTP_1_1: &str = "HTTP/1.1";

/// A parsed HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: String,
    resource: String,
    version: String,
    inputs: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    chunking_allowed: bool,
}

impl Request {
    /// Reads one request from `reader`.
    ///
    /// Reads the request line, the headers and, when `Content-Length` is
    /// present, exactly that many body bytes. Query parameters and
    /// `application/x-www-form-urlencoded` bodies become inputs.
    pub fn parse<R: BufRead>(reader: &mut R) -> Result<Self, HttpError> {
        let mut budget = MAX_HEAD_BYTES;
        let request_line = match read_head_line(reader, &mut budget)? {
            Some(line) => line,
            None => return Err(HttpError::EmptyRequest),
        };
        let (method, target, version) = split_request_line(&request_line)?;

        let mut headers = Vec::new();
        while let Some(line) = read_head_line(reader, &mut budget)? {
            if line.is_empty() {
                break;
            }
            headers.push(split_header(&line)?);
        }

        let body = read_body(reader, &headers)?;
        let (resource, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };

        let mut inputs = query.map(parse_inputs).unwrap_or_default();
        if is_form_body(&headers) {
            inputs.extend(parse_inputs(&String::from_utf8_lossy(&body)));
        }

        Ok(Self {
            method: method.to_owned(),
            resource: decode(resource),
            chunking_allowed: version == HTTP_1_1,
            version: version.to_owned(),
            inputs,
            headers,
            body,
        })
    }

    /// Request method, e.g. `GET`.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Decoded request path without the query string.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Protocol version from the request line.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// First input (query or form parameter) named `name`.
    #[must_use]
    pub fn input(&self, name: &str) -> Option<&str> {
        self.inputs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First header named `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Raw request body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Whether the response to this request may use chunked framing.
    #[must_use]
    pub const fn allows_chunking(&self) -> bool {
        self.chunking_allowed
    }
}

/// Builds a [`Request`] from a textual command such as `/FrontPage?format=text`.
///
/// The command is `[METHOD] target`; the method defaults to `GET` and a
/// missing leading `/` is added. The request is rendered as HTTP text and run
/// through [`Request::parse`], so commands and network requests cannot drift
/// apart.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    command: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    chunking_allowed: bool,
}

impl RequestBuilder {
    /// Starts a builder for the given command.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            headers: Vec::new(),
            body: Vec::new(),
            chunking_allowed: true,
        }
    }

    /// Forbids chunked framing of the response.
    #[must_use]
    pub fn no_chunk(mut self) -> Self {
        self.chunking_allowed = false;
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the body; `Content-Length` is added automatically.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Parses the command into a request.
    pub fn build(self) -> Result<Request, HttpError> {
        let command = self.command.trim();
        if command.is_empty() {
            return Err(HttpError::EmptyCommand);
        }

        let mut words = command.split_whitespace();
        let (method, target) = match (words.next(), words.next()) {
            (Some(target), None) => (DEFAULT_METHOD, target),
            (Some(method), Some(target)) => (method, target),
            (None, _) => return Err(HttpError::EmptyCommand),
        };
        let target = if target.starts_with('/') {
            target.to_owned()
        } else {
            format!("/{target}")
        };

        let mut raw = format!("{method} {target} {HTTP_1_1}\r\n").into_bytes();
        for (name, value) in &self.headers {
            raw.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
        }
        if !self.body.is_empty() {
            raw.extend_from_slice(format!("Content-Length: {}\r\n", self.body.len()).as_bytes());
        }
        raw.extend_from_slice(b"\r\n");
        raw.extend_from_slice(&self.body);

        let mut request = Request::parse(&mut raw.as_slice())?;
        request.chunking_allowed = self.chunking_allowed;
        Ok(request)
    }
}

/// Reads one CRLF or LF terminated line, charging it against `budget`.
///
/// Returns `None` at end of stream. An exhausted budget is an oversized
/// head, not end of stream.
fn read_head_line<R: BufRead>(
    reader: &mut R,
    budget: &mut usize,
) -> Result<Option<String>, HttpError> {
    if *budget == 0 {
        return Err(HttpError::HeadTooLarge {
            limit: MAX_HEAD_BYTES,
        });
    }
    let mut line = Vec::new();
    let limit = u64::try_from(*budget).unwrap_or(u64::MAX);
    let read = reader.by_ref().take(limit).read_until(b'\n', &mut line)?;
    if read == 0 {
        return Ok(None);
    }
    if !line.ends_with(b"\n") && read >= *budget {
        return Err(HttpError::HeadTooLarge {
            limit: MAX_HEAD_BYTES,
        });
    }
    *budget = budget.saturating_sub(read);
    while line.last().is_some_and(|byte| *byte == b'\n' || *byte == b'\r') {
        line.pop();
    }
    Ok(Some(String::from_utf8_lossy(&line).into_owned()))
}

fn split_request_line(line: &str) -> Result<(&str, &str, &str), HttpError> {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(target), Some(version), None)
            if target.starts_with('/') && version.starts_with("HTTP/") =>
        {
            Ok((method, target, version))
        }
        _ => Err(HttpError::MalformedRequestLine {
            line: line.to_owned(),
        }),
    }
}

fn split_header(line: &str) -> Result<(String, String), HttpError> {
    match line.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_owned(), value.trim().to_owned()))
        }
        _ => Err(HttpError::MalformedHeader {
            line: line.to_owned(),
        }),
    }
}

fn read_body<R: BufRead>(reader: &mut R, headers: &[(String, String)]) -> Result<Vec<u8>, HttpError> {
    let Some(value) = find_header(headers, "Content-Length") else {
        return Ok(Vec::new());
    };
    let length: u64 = value
        .parse()
        .map_err(|_| HttpError::InvalidContentLength {
            value: value.to_owned(),
        })?;
    let mut body = Vec::new();
    reader.by_ref().take(length).read_to_end(&mut body)?;
    let received = u64::try_from(body.len()).unwrap_or(u64::MAX);
    if received < length {
        return Err(HttpError::TruncatedBody {
            expected: length,
            received,
        });
    }
    Ok(body)
}

fn is_form_body(headers: &[(String, String)]) -> bool {
    find_header(headers, "Content-Type")
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"))
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

fn parse_inputs(text: &str) -> Vec<(String, String)> {
    text.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (decode(key), decode(value)),
            None => (decode(pair), String::new()),
        })
        .collect()
}

fn decode(text: &str) -> String {
    let spaced = text.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}
