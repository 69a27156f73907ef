//! Error types for listener construction and the accept loop.

use std::io;

use camino::Utf8PathBuf;
use gantry_config::ClientAuth;
use thiserror::Error;

/// Errors surfaced while building a listening socket.
#[derive(Debug, Error)]
pub enum SocketError {
    /// The bind host did not resolve.
    #[error("failed to resolve listener address {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
    /// The bind host resolved to no usable address.
    #[error("no listener addresses resolved for {host}:{port}")]
    ResolveEmpty { host: String, port: u16 },
    /// Binding the port failed, typically because it is already in use.
    #[error("failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },
    /// The bound socket could not report its address.
    #[error("failed to read listener address: {source}")]
    LocalAddress {
        #[source]
        source: io::Error,
    },
    /// TLS was requested with unusable parameters.
    #[error("invalid TLS configuration: {0}")]
    Configuration(#[from] TlsError),
}

impl SocketError {
    /// Port that could not be bound, when that is the failure.
    #[must_use]
    pub const fn bind_port(&self) -> Option<u16> {
        match self {
            Self::Bind { port, .. } => Some(*port),
            _ => None,
        }
    }
}

/// Errors raised while assembling a TLS server configuration.
#[derive(Debug, Error)]
pub enum TlsError {
    /// No parameter set is registered under the requested name.
    #[error("unknown TLS parameter set '{name}'")]
    UnknownParameters { name: String },
    /// TLS is enabled but no certificate chain was configured.
    #[error("TLS is enabled but no certificate was configured")]
    MissingCertificate,
    /// TLS is enabled but no private key was configured.
    #[error("TLS is enabled but no private key was configured")]
    MissingPrivateKey,
    /// Client authentication needs trusted roots.
    #[error("client authentication '{mode}' requires client CA roots")]
    MissingClientRoots { mode: ClientAuth },
    /// A PEM file could not be read.
    #[error("failed to read PEM file {path}: {source}")]
    ReadPem {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    /// A PEM file held no certificates.
    #[error("no certificates found in {path}")]
    NoCertificates { path: Utf8PathBuf },
    /// A PEM file held no private key.
    #[error("no private key found in {path}")]
    NoPrivateKey { path: Utf8PathBuf },
    /// rustls rejected the assembled configuration.
    #[error("{0}")]
    Rustls(#[from] rustls::Error),
    /// The client certificate verifier could not be built.
    #[error("failed to build client verifier: {0}")]
    Verifier(#[from] rustls::server::VerifierBuilderError),
}

/// Errors surfaced by the connection acceptor.
#[derive(Debug, Error)]
pub enum AcceptorError {
    /// `start` was called on an acceptor that is already listening.
    #[error("acceptor is already listening")]
    AlreadyListening,
    /// `start` was called on a stopped acceptor.
    #[error("acceptor has been stopped and cannot be restarted")]
    Stopped,
    /// The listener could not switch to non-blocking mode.
    #[error("failed to enable non-blocking listener: {source}")]
    NonBlocking {
        #[source]
        source: io::Error,
    },
    /// The accept thread could not be spawned.
    #[error("failed to spawn acceptor thread: {source}")]
    Spawn {
        #[source]
        source: io::Error,
    },
    /// The accept thread panicked.
    #[error("acceptor thread panicked")]
    ThreadPanic,
}
