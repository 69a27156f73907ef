//! Transport and dispatch core of the Gantry service.
//!
//! The daemon binds a plain or TLS listener, accepts connections on a
//! dedicated thread and hands each one to a bounded worker pool. When the
//! pool and its queue are saturated new connections are rejected and closed
//! immediately rather than queued without bound. The same request pipeline
//! is also reachable without any socket through
//! [`Service::execute_single_command`], which runs one request in the calling
//! thread and writes the response body to an output sink.
//!
//! ## Layers
//!
//! 1. [`transport`] builds listeners ([`SocketFactory`]), wraps accepted
//!    streams in a [`Connection`] and runs the accept loop
//!    ([`ConnectionAcceptor`]).
//! 2. [`dispatch`] owns the worker pool ([`RequestDispatcher`]), the unit of
//!    work ([`WorkItem`]) and the overload policy ([`RejectionPolicy`]).
//! 3. [`Service`] ties both together and owns the start/stop lifecycle.
//!
//! Application behaviour plugs in through the [`Expediter`] trait; the
//! transport never looks inside requests beyond parsing and serialising
//! them.

mod command;
pub mod dispatch;
mod files;
mod health;
mod pipeline;
mod process;
mod service;
pub mod telemetry;
pub mod transport;

pub use command::{CommandExecutionError, SingleCommandExecutor};
pub use dispatch::{
    AdmissionRejected, CloseAndWarn, ExecutionStrategy, HandlerError, ImmediateExecution, Job,
    RejectionPolicy, RequestDispatcher, WorkItem,
};
pub use files::FilesExpediter;
pub use health::{HealthReporter, StructuredHealthReporter};
pub use pipeline::{Expediter, HttpConnectionHandler};
pub use process::{
    LaunchError, ShutdownCause, ShutdownError, ShutdownSignal, SystemShutdownSignal, run, run_with,
};
pub use service::{Service, StartError};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{
    AcceptorError, AcceptorPhase, Connection, ConnectionAcceptor, ConnectionHandler, Listener,
    SocketError, SocketFactory, TlsError, TlsParameterBuilder, TlsParameterRegistry,
    TlsParameters,
};

#[cfg(test)]
mod tests;
