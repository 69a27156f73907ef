//! Listening sockets and the connection accept loop.
//!
//! The transport module builds plain or TLS listeners and accepts
//! connections in a background thread, handing each one to an
//! [`ExecutionStrategy`](crate::dispatch::ExecutionStrategy).

mod acceptor;
#[cfg(test)]
mod acceptor_tests;
mod connection;
mod errors;
mod handler;
mod socket_factory;
#[cfg(test)]
pub(crate) mod test_utils;
mod tls;

pub use self::acceptor::{AcceptorPhase, ConnectionAcceptor};
pub use self::connection::Connection;
pub use self::errors::{AcceptorError, SocketError, TlsError};
pub use self::handler::ConnectionHandler;
pub use self::socket_factory::{Listener, SocketFactory};
pub use self::tls::{TlsParameterBuilder, TlsParameterRegistry, TlsParameters};

const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
