//! Accepted connection streams.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};

use rustls::{ServerConnection, StreamOwned};

/// A client connection accepted by the listener.
///
/// TLS connections complete their handshake lazily on first read or write,
/// so the accept loop never blocks on a slow client.
pub enum Connection {
    /// Plain TCP stream.
    Tcp(TcpStream),
    /// TCP stream wrapped in a server-side TLS session.
    Tls(Box<StreamOwned<ServerConnection, TcpStream>>),
}

impl Connection {
    /// Wraps `stream` in a TLS session.
    #[must_use]
    pub fn tls(session: ServerConnection, stream: TcpStream) -> Self {
        Self::Tls(Box::new(StreamOwned::new(session, stream)))
    }

    /// Remote address of the peer, if the socket still knows it.
    #[must_use]
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.socket().peer_addr().ok()
    }

    /// Whether the connection is TLS-wrapped.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    /// Closes the connection, sending a TLS `close_notify` first when the
    /// session is established.
    ///
    /// Never reads from the peer: a session still handshaking is dropped
    /// with a plain TCP shutdown.
    pub fn close(mut self) -> io::Result<()> {
        if let Self::Tls(stream) = &mut self
            && !stream.conn.is_handshaking()
        {
            let session = &mut **stream;
            session.conn.send_close_notify();
            while session.conn.wants_write() {
                session.conn.write_tls(&mut session.sock)?;
            }
        }
        match self.socket().shutdown(Shutdown::Both) {
            Err(error) if error.kind() != io::ErrorKind::NotConnected => Err(error),
            _ => Ok(()),
        }
    }

    fn socket(&self) -> &TcpStream {
        match self {
            Self::Tcp(stream) => stream,
            Self::Tls(stream) => stream.get_ref(),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("tls", &self.is_tls())
            .field("peer", &self.peer_addr())
            .finish()
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            Self::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            Self::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            Self::Tls(stream) => stream.flush(),
        }
    }
}
