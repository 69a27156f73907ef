//! Construction of plain and TLS listening sockets.

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::Arc;

use gantry_config::Config;
use rustls::{ServerConfig, ServerConnection};
use tracing::debug;

use super::tls::build_server_config;
use super::{Connection, SocketError, TRANSPORT_TARGET, TlsParameterRegistry};

/// A bound listening socket, optionally wrapping accepted streams in TLS.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    tls: Option<Arc<ServerConfig>>,
    local_addr: SocketAddr,
}

impl Listener {
    /// Address the socket is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether accepted connections are TLS-wrapped.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    pub(crate) fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        self.inner.set_nonblocking(nonblocking)
    }

    /// Accepts one pending connection.
    ///
    /// Returns `Ok(None)` when the socket is non-blocking and nothing is
    /// waiting. Accepted streams are switched back to blocking mode.
    pub fn accept(&self) -> io::Result<Option<Connection>> {
        let stream = match self.inner.accept() {
            Ok((stream, _)) => stream,
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(None),
            Err(error) => return Err(error),
        };
        stream.set_nonblocking(false)?;
        match &self.tls {
            None => Ok(Some(Connection::Tcp(stream))),
            Some(config) => {
                let session = ServerConnection::new(Arc::clone(config))
                    .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;
                Ok(Some(Connection::tls(session, stream)))
            }
        }
    }
}

/// Builds listeners from service configuration.
#[derive(Debug, Clone, Copy)]
pub struct SocketFactory<'a> {
    registry: &'a TlsParameterRegistry,
}

impl<'a> SocketFactory<'a> {
    /// Creates a factory resolving TLS parameter sets from `registry`.
    #[must_use]
    pub const fn new(registry: &'a TlsParameterRegistry) -> Self {
        Self { registry }
    }

    /// Binds a listener on the configured host and port.
    ///
    /// TLS settings are validated before the port is touched, so a bad
    /// configuration never leaves a socket bound.
    pub fn create_listener(&self, config: &Config) -> Result<Listener, SocketError> {
        let tls = if config.tls().enabled {
            Some(build_server_config(config.tls(), self.registry)?)
        } else {
            None
        };
        let inner = bind_tcp(&config.bind_host, config.port())?;
        let local_addr = inner
            .local_addr()
            .map_err(|source| SocketError::LocalAddress { source })?;
        debug!(
            target: TRANSPORT_TARGET,
            address = %local_addr,
            tls = tls.is_some(),
            "listener bound"
        );
        Ok(Listener {
            inner,
            tls,
            local_addr,
        })
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, SocketError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| SocketError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?;
    let addr = addrs.next().ok_or_else(|| SocketError::ResolveEmpty {
        host: host.to_owned(),
        port,
    })?;
    TcpListener::bind(addr).map_err(|source| SocketError::Bind { port, source })
}
