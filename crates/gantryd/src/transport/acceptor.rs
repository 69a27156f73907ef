//! Accept loop feeding connections to an execution strategy.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::dispatch::{ExecutionStrategy, WorkItem};

use super::{AcceptorError, ConnectionHandler, Listener, TRANSPORT_TARGET};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Lifecycle phase of a [`ConnectionAcceptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptorPhase {
    /// Bound but not yet accepting.
    Idle,
    /// The accept thread is running.
    Listening,
    /// Terminal: the socket has been released.
    Stopped,
}

/// Owns a listener and runs its accept loop on a dedicated thread.
///
/// The acceptor moves from idle to listening on [`start`](Self::start) and
/// to stopped on [`stop`](Self::stop). A stopped acceptor cannot be
/// restarted; build a new one from a fresh listener instead.
pub struct ConnectionAcceptor {
    state: Mutex<AcceptorState>,
    shutdown: Arc<AtomicBool>,
    local_addr: SocketAddr,
}

enum AcceptorState {
    Idle(Box<AcceptLoop>),
    Listening(JoinHandle<()>),
    Stopped,
}

struct AcceptLoop {
    listener: Listener,
    executor: Arc<dyn ExecutionStrategy>,
    handler: Arc<dyn ConnectionHandler>,
}

impl ConnectionAcceptor {
    /// Creates an idle acceptor.
    #[must_use]
    pub fn new(
        listener: Listener,
        executor: Arc<dyn ExecutionStrategy>,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Self {
        let local_addr = listener.local_addr();
        Self {
            state: Mutex::new(AcceptorState::Idle(Box::new(AcceptLoop {
                listener,
                executor,
                handler,
            }))),
            shutdown: Arc::new(AtomicBool::new(false)),
            local_addr,
        }
    }

    /// Address of the underlying listener.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> AcceptorPhase {
        match *self.state.lock().unwrap_or_else(PoisonError::into_inner) {
            AcceptorState::Idle(_) => AcceptorPhase::Idle,
            AcceptorState::Listening(_) => AcceptorPhase::Listening,
            AcceptorState::Stopped => AcceptorPhase::Stopped,
        }
    }

    /// Spawns the accept thread.
    pub fn start(&self) -> Result<(), AcceptorError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let accept_loop = match std::mem::replace(&mut *state, AcceptorState::Stopped) {
            AcceptorState::Idle(accept_loop) => accept_loop,
            AcceptorState::Listening(handle) => {
                *state = AcceptorState::Listening(handle);
                return Err(AcceptorError::AlreadyListening);
            }
            AcceptorState::Stopped => return Err(AcceptorError::Stopped),
        };
        accept_loop
            .listener
            .set_nonblocking(true)
            .map_err(|source| AcceptorError::NonBlocking { source })?;
        let shutdown = Arc::clone(&self.shutdown);
        let handle = thread::Builder::new()
            .name("gantry-acceptor".to_owned())
            .spawn(move || run_accept_loop(&accept_loop, &shutdown))
            .map_err(|source| AcceptorError::Spawn { source })?;
        *state = AcceptorState::Listening(handle);
        Ok(())
    }

    /// Ends the accept loop and releases the socket.
    ///
    /// Idempotent. Stopping an idle acceptor drops its listener without
    /// ever accepting.
    pub fn stop(&self) -> Result<(), AcceptorError> {
        self.shutdown.store(true, Ordering::SeqCst);
        let previous = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *state, AcceptorState::Stopped)
        };
        match previous {
            AcceptorState::Listening(handle) => {
                handle.join().map_err(|_| AcceptorError::ThreadPanic)
            }
            AcceptorState::Idle(_) | AcceptorState::Stopped => Ok(()),
        }
    }
}

impl Drop for ConnectionAcceptor {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_accept_loop(accept_loop: &AcceptLoop, shutdown: &AtomicBool) {
    info!(
        target: TRANSPORT_TARGET,
        address = %accept_loop.listener.local_addr(),
        tls = accept_loop.listener.is_tls(),
        "listener active"
    );
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match accept_loop.listener.accept() {
            Ok(Some(connection)) => {
                last_error = None;
                let item = WorkItem::new(connection, Arc::clone(&accept_loop.handler));
                if let Err(reason) = accept_loop.executor.execute(Box::new(item)) {
                    debug!(
                        target: TRANSPORT_TARGET,
                        reason = %reason,
                        "connection refused by dispatcher"
                    );
                }
            }
            Ok(None) => thread::sleep(ACCEPT_BACKOFF),
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: TRANSPORT_TARGET,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
    info!(target: TRANSPORT_TARGET, "listener stopped");
}
