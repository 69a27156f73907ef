//! Service lifecycle: directory preparation, start, stop.

use std::fs;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwapOption;
use gantry_config::Config;
use thiserror::Error;
use tracing::{debug, warn};

use crate::command::{CommandExecutionError, SingleCommandExecutor};
use crate::dispatch::{CloseAndWarn, ExecutionStrategy, RejectionPolicy, RequestDispatcher};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::pipeline::{Expediter, HttpConnectionHandler};
use crate::transport::{
    AcceptorError, ConnectionAcceptor, ConnectionHandler, SocketError, SocketFactory,
    TlsParameterBuilder, TlsParameterRegistry,
};

const SERVICE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::service");

/// Errors raised while starting the service.
#[derive(Debug, Error)]
pub enum StartError {
    /// A live listener already exists.
    #[error("service is already running")]
    AlreadyRunning,
    /// The listening socket could not be created.
    #[error("failed to create listener: {0}")]
    Listener(#[from] SocketError),
    /// The accept loop could not be started.
    #[error("failed to start acceptor: {0}")]
    Acceptor(#[from] AcceptorError),
}

/// Live acceptor and dispatcher of a running service.
struct ServiceHandle {
    acceptor: ConnectionAcceptor,
    dispatcher: Arc<RequestDispatcher>,
}

impl ServiceHandle {
    fn close(&self) {
        if let Err(error) = self.acceptor.stop() {
            warn!(
                target: SERVICE_TARGET,
                error = %error,
                "acceptor did not stop cleanly"
            );
        }
        self.dispatcher.shutdown();
    }
}

/// A network service front-end.
///
/// `start` binds the configured listener and begins accepting connections on
/// a background thread; each connection runs through the request pipeline on
/// a bounded worker pool. `stop` tears the listener and pool down again and
/// may be followed by another `start`.
pub struct Service {
    config: Config,
    make_dirs: AtomicBool,
    handler: Arc<HttpConnectionHandler>,
    registry: TlsParameterRegistry,
    reporter: Arc<dyn HealthReporter>,
    policy: Arc<dyn RejectionPolicy>,
    live: ArcSwapOption<ServiceHandle>,
}

impl Service {
    /// Creates a stopped service answering requests with `expediter`.
    #[must_use]
    pub fn new(config: Config, expediter: Arc<dyn Expediter>) -> Self {
        let make_dirs = config.make_directories;
        Self {
            config,
            make_dirs: AtomicBool::new(make_dirs),
            handler: Arc::new(HttpConnectionHandler::new(expediter)),
            registry: TlsParameterRegistry::default(),
            reporter: Arc::new(StructuredHealthReporter::new()),
            policy: Arc::new(CloseAndWarn),
            live: ArcSwapOption::empty(),
        }
    }

    /// Replaces the lifecycle event reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn HealthReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Replaces the policy applied to connections the pool refuses.
    #[must_use]
    pub fn with_rejection_policy(mut self, policy: Arc<dyn RejectionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Registers an additional named TLS parameter set.
    #[must_use]
    pub fn register_tls_parameters(
        mut self,
        name: impl Into<String>,
        builder: TlsParameterBuilder,
    ) -> Self {
        self.registry.register(name, builder);
        self
    }

    /// Disables directory preparation from the next `start` onwards.
    pub fn dont_make_dirs(&self) {
        self.make_dirs.store(false, Ordering::SeqCst);
    }

    /// Configuration the service was built with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Whether a listener is live.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.live.load().is_some()
    }

    /// Address of the live listener.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.live
            .load_full()
            .map(|handle| handle.acceptor.local_addr())
    }

    /// Starts the service, reporting any failure through the health reporter.
    ///
    /// Returns `false` when start-up failed; the diagnostics have already
    /// been emitted.
    pub fn start(&self) -> bool {
        self.try_start().is_ok()
    }

    /// Starts the service.
    ///
    /// With port `0` no listener is opened: start-up succeeds but
    /// [`is_running`](Self::is_running) stays `false`.
    pub fn try_start(&self) -> Result<(), StartError> {
        self.reporter.service_starting(&self.config);
        if self.make_dirs.load(Ordering::SeqCst) {
            self.prepare_directories();
        }
        if !self.config.listener_enabled() {
            self.reporter.service_started(None);
            return Ok(());
        }
        let result = self.open();
        match &result {
            Ok(address) => self.reporter.service_started(Some(*address)),
            Err(error) => self.reporter.service_start_failed(&self.config, error),
        }
        result.map(|_| ())
    }

    fn open(&self) -> Result<SocketAddr, StartError> {
        if self.is_running() {
            return Err(StartError::AlreadyRunning);
        }
        let listener = SocketFactory::new(&self.registry).create_listener(&self.config)?;
        let dispatcher = Arc::new(RequestDispatcher::with_policy(
            *self.config.workers(),
            Arc::clone(&self.policy),
        ));
        let executor: Arc<dyn ExecutionStrategy> = Arc::clone(&dispatcher) as _;
        let handler: Arc<dyn ConnectionHandler> = Arc::clone(&self.handler) as _;
        let acceptor = ConnectionAcceptor::new(listener, executor, handler);
        let handle = Arc::new(ServiceHandle {
            acceptor,
            dispatcher,
        });
        if let Err(error) = handle.acceptor.start() {
            handle.close();
            return Err(error.into());
        }

        let empty: Option<Arc<ServiceHandle>> = None;
        let previous = self.live.compare_and_swap(&empty, Some(Arc::clone(&handle)));
        if previous.is_some() {
            handle.close();
            return Err(StartError::AlreadyRunning);
        }
        Ok(handle.acceptor.local_addr())
    }

    /// Creates the root directory and then its `files` subdirectory.
    ///
    /// Missing ancestors of the root are not created. A failure is logged
    /// and start-up continues.
    fn prepare_directories(&self) {
        let files = self.config.files_path();
        for directory in [self.config.root_path(), files.as_path()] {
            match fs::create_dir(directory) {
                Ok(()) => debug!(
                    target: SERVICE_TARGET,
                    path = %directory,
                    "created storage directory"
                ),
                Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {}
                Err(error) => {
                    warn!(
                        target: SERVICE_TARGET,
                        path = %directory,
                        error = %error,
                        "failed to create storage directory"
                    );
                    return;
                }
            }
        }
    }

    /// Stops the service.
    ///
    /// Safe to call when the service never started and from several threads
    /// at once; exactly one caller tears the live handle down.
    pub fn stop(&self) {
        if let Some(handle) = self.live.swap(None) {
            handle.close();
            self.reporter.service_stopped();
        }
    }

    /// Runs `command` through the request pipeline on the calling thread and
    /// writes the response body to `out`.
    pub fn execute_single_command<W: Write + ?Sized>(
        &self,
        command: &str,
        out: &mut W,
    ) -> Result<(), CommandExecutionError> {
        SingleCommandExecutor::new(Arc::clone(&self.handler)).execute(command, out)
    }
}

impl Drop for Service {
    fn drop(&mut self) {
        self.stop();
    }
}
