//! Default expediter serving static files from the root storage directory.

use std::fs;
use std::io;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use gantry_http::{Request, Response};

use crate::pipeline::Expediter;

const FILES_PREFIX: &str = "/files/";
const STATUS_BAD_REQUEST: u16 = 400;
const STATUS_NOT_FOUND: u16 = 404;
const STATUS_METHOD_NOT_ALLOWED: u16 = 405;
const STATUS_INTERNAL_ERROR: u16 = 500;

/// Serves `GET /files/...` from a directory on disk.
#[derive(Debug, Clone)]
pub struct FilesExpediter {
    root: Utf8PathBuf,
}

impl FilesExpediter {
    /// Serves files below `root`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory files are served from.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn resolve(&self, relative: &str) -> Option<Utf8PathBuf> {
        let relative = Utf8Path::new(relative);
        relative
            .components()
            .all(|component| matches!(component, Utf8Component::Normal(_)))
            .then(|| self.root.join(relative))
    }
}

impl Expediter for FilesExpediter {
    fn respond(&self, request: &Request) -> Response {
        let Some(relative) = request.resource().strip_prefix(FILES_PREFIX) else {
            return Response::error(STATUS_NOT_FOUND, format!("{} not found", request.resource()));
        };
        if !matches!(request.method(), "GET" | "HEAD") {
            return Response::error(
                STATUS_METHOD_NOT_ALLOWED,
                format!("{} is not supported", request.method()),
            );
        }
        let Some(path) = self.resolve(relative) else {
            return Response::error(STATUS_BAD_REQUEST, "invalid file path");
        };
        match fs::read(&path) {
            Ok(contents) => {
                let body = if request.method() == "HEAD" {
                    Vec::new()
                } else {
                    contents
                };
                Response::ok()
                    .with_header("Content-Type", content_type(&path))
                    .with_body(body)
            }
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::IsADirectory
                ) =>
            {
                Response::error(STATUS_NOT_FOUND, format!("{} not found", request.resource()))
            }
            Err(error) => Response::error(STATUS_INTERNAL_ERROR, error.to_string()),
        }
    }
}

fn content_type(path: &Utf8Path) -> &'static str {
    match path.extension().map(str::to_ascii_lowercase).as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
