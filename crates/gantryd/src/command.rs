//! In-process execution of a single request.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use gantry_http::{HttpError, Request, RequestBuilder, Response};
use thiserror::Error;

use crate::dispatch::{AdmissionRejected, ExecutionStrategy, HandlerError, ImmediateExecution, Job};
use crate::pipeline::HttpConnectionHandler;

/// Errors surfaced by [`SingleCommandExecutor::execute`].
#[derive(Debug, Error)]
pub enum CommandExecutionError {
    /// The command could not be turned into a request.
    #[error("invalid command: {0}")]
    Request(#[from] HttpError),
    /// The execution strategy refused the command.
    #[error("command was not executed: {0}")]
    Rejected(#[from] AdmissionRejected),
    /// The pipeline finished without producing a response.
    #[error("command produced no response")]
    NoResponse,
    /// The response status was not `200`.
    #[error("error loading page: {status}")]
    Status { status: u16 },
    /// The response body could not be written to the sink.
    #[error("failed to write command output: {0}")]
    Output(#[source] io::Error),
}

/// Runs one request through the connection pipeline without a socket.
#[derive(Clone)]
pub struct SingleCommandExecutor {
    handler: Arc<HttpConnectionHandler>,
}

impl SingleCommandExecutor {
    /// Executes through `handler`, the same pipeline pooled workers use.
    #[must_use]
    pub const fn new(handler: Arc<HttpConnectionHandler>) -> Self {
        Self { handler }
    }

    /// Runs `command` on the calling thread and writes the response body to
    /// `out`.
    ///
    /// The request is built with chunked framing disabled and the response
    /// is written without its status line or headers.
    pub fn execute<W: Write + ?Sized>(
        &self,
        command: &str,
        out: &mut W,
    ) -> Result<(), CommandExecutionError> {
        let request = RequestBuilder::new(command).no_chunk().build()?;
        let slot = Arc::new(Mutex::new(None));
        let job = CommandJob {
            handler: Arc::clone(&self.handler),
            request,
            slot: Arc::clone(&slot),
        };
        ImmediateExecution.execute(Box::new(job))?;

        let mut response = slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(CommandExecutionError::NoResponse)?;
        if !response.is_ok() {
            return Err(CommandExecutionError::Status {
                status: response.status(),
            });
        }
        response.without_http_headers();
        response.write_to(out).map_err(CommandExecutionError::Output)
    }
}

struct CommandJob {
    handler: Arc<HttpConnectionHandler>,
    request: Request,
    slot: Arc<Mutex<Option<Response>>>,
}

impl Job for CommandJob {
    fn run(self: Box<Self>) -> Result<(), HandlerError> {
        let response = self.handler.respond(&self.request);
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(response);
        Ok(())
    }

    fn abandon(self: Box<Self>) {}

    fn describe(&self) -> String {
        format!("command {} {}", self.request.method(), self.request.resource())
    }
}
