//! Units of work accepted by an execution strategy.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::transport::{Connection, ConnectionHandler};

use super::{DISPATCH_TARGET, HandlerError};

/// A unit of work that runs exactly once.
pub trait Job: Send + 'static {
    /// Runs the job to completion.
    fn run(self: Box<Self>) -> Result<(), HandlerError>;

    /// Releases the job's resources without running it.
    fn abandon(self: Box<Self>);

    /// Short description used in log events.
    fn describe(&self) -> String;
}

/// An accepted connection paired with the handler that will serve it.
pub struct WorkItem {
    connection: Connection,
    handler: Arc<dyn ConnectionHandler>,
}

impl WorkItem {
    /// Pairs `connection` with `handler`.
    #[must_use]
    pub fn new(connection: Connection, handler: Arc<dyn ConnectionHandler>) -> Self {
        Self {
            connection,
            handler,
        }
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}

impl Job for WorkItem {
    fn run(self: Box<Self>) -> Result<(), HandlerError> {
        let Self {
            connection,
            handler,
        } = *self;
        handler.handle(connection)
    }

    fn abandon(self: Box<Self>) {
        let peer = self.connection.peer_addr();
        if let Err(error) = self.connection.close() {
            debug!(
                target: DISPATCH_TARGET,
                peer = ?peer,
                error = %error,
                "failed to close abandoned connection"
            );
        }
    }

    fn describe(&self) -> String {
        match self.connection.peer_addr() {
            Some(peer) => format!("connection from {peer}"),
            None => "connection".to_owned(),
        }
    }
}
