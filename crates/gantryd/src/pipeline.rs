//! Request pipeline shared by pooled workers and the single-command path.

use std::io::BufReader;
use std::sync::Arc;

use gantry_http::{Request, Response};
use tracing::debug;

use crate::dispatch::HandlerError;
use crate::transport::{Connection, ConnectionHandler};

const PIPELINE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::pipeline");
const STATUS_BAD_REQUEST: u16 = 400;

/// Application logic turning a request into a response.
pub trait Expediter: Send + Sync + 'static {
    /// Produces the response for `request`.
    fn respond(&self, request: &Request) -> Response;
}

impl<F> Expediter for F
where
    F: Fn(&Request) -> Response + Send + Sync + 'static,
{
    fn respond(&self, request: &Request) -> Response {
        self(request)
    }
}

/// Reads one request from a connection, expedites it and writes the reply.
#[derive(Clone)]
pub struct HttpConnectionHandler {
    expediter: Arc<dyn Expediter>,
}

impl HttpConnectionHandler {
    /// Wraps `expediter`.
    #[must_use]
    pub fn new(expediter: Arc<dyn Expediter>) -> Self {
        Self { expediter }
    }

    /// Produces the response for `request`, honouring its framing limits.
    #[must_use]
    pub fn respond(&self, request: &Request) -> Response {
        let mut response = self.expediter.respond(request);
        if !request.allows_chunking() {
            response.no_chunk();
        }
        response
    }
}

impl ConnectionHandler for HttpConnectionHandler {
    fn handle(&self, mut connection: Connection) -> Result<(), HandlerError> {
        let parsed = Request::parse(&mut BufReader::new(&mut connection));
        let request = match parsed {
            Ok(request) => request,
            Err(error) if error.is_disconnect() => {
                debug!(
                    target: PIPELINE_TARGET,
                    peer = ?connection.peer_addr(),
                    "peer closed before sending a request"
                );
                return connection.close().map_err(HandlerError::Close);
            }
            Err(error) => {
                let reply = Response::error(STATUS_BAD_REQUEST, error.to_string());
                let outcome = reply
                    .write_to(&mut connection)
                    .and_then(|()| connection.close());
                if let Err(cleanup) = outcome {
                    debug!(
                        target: PIPELINE_TARGET,
                        error = %cleanup,
                        "failed to answer bad request"
                    );
                }
                return Err(HandlerError::Read(error));
            }
        };
        let response = self.respond(&request);
        debug!(
            target: PIPELINE_TARGET,
            method = request.method(),
            resource = request.resource(),
            status = response.status(),
            "request expedited"
        );
        response
            .write_to(&mut connection)
            .map_err(HandlerError::Write)?;
        connection.close().map_err(HandlerError::Close)
    }
}
