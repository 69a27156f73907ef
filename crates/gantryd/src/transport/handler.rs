//! Connection handling abstraction for the accept loop.

use crate::dispatch::HandlerError;

use super::Connection;

/// Handles accepted connections.
///
/// Implementations own the connection for its whole lifetime and must close
/// it before returning.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection.
    fn handle(&self, connection: Connection) -> Result<(), HandlerError>;
}
