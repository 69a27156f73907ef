//! Bounded worker pool.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use gantry_config::WorkerPoolSettings;
use tracing::{debug, info, warn};

use super::{
    AdmissionRejected, CloseAndWarn, DISPATCH_TARGET, ExecutionStrategy, Job, RejectionPolicy,
    run_contained,
};

const MIN_IDLE_POLL: Duration = Duration::from_millis(1);

/// Runs jobs on a bounded set of worker threads.
///
/// `min_workers` threads are started eagerly and stay alive. Further workers
/// are started on demand up to `max_workers` and exit after sitting idle for
/// `idle_timeout`. At most `max_workers + queue_capacity` admitted jobs may
/// be outstanding; submissions beyond that are refused synchronously and
/// handed to the rejection policy.
pub struct RequestDispatcher {
    shared: Arc<Shared>,
    sender: Mutex<Option<Sender<Box<dyn Job>>>>,
    policy: Arc<dyn RejectionPolicy>,
}

struct Shared {
    settings: WorkerPoolSettings,
    receiver: Receiver<Box<dyn Job>>,
    state: Mutex<PoolState>,
    workers_exited: Condvar,
    next_id: AtomicUsize,
}

#[derive(Debug, Default)]
struct PoolState {
    workers: usize,
    in_flight: usize,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RequestDispatcher {
    /// Creates a dispatcher that warns and closes refused connections.
    #[must_use]
    pub fn new(settings: WorkerPoolSettings) -> Self {
        Self::with_policy(settings, Arc::new(CloseAndWarn))
    }

    /// Creates a dispatcher with an explicit rejection policy.
    #[must_use]
    pub fn with_policy(settings: WorkerPoolSettings, policy: Arc<dyn RejectionPolicy>) -> Self {
        let (sender, receiver) = bounded(settings.admission_limit().max(1));
        let dispatcher = Self {
            shared: Arc::new(Shared {
                settings,
                receiver,
                state: Mutex::new(PoolState::default()),
                workers_exited: Condvar::new(),
                next_id: AtomicUsize::new(0),
            }),
            sender: Mutex::new(Some(sender)),
            policy,
        };
        {
            let mut state = dispatcher.shared.state();
            for _ in 0..settings.min_workers {
                spawn_worker(&dispatcher.shared, &mut state);
            }
        }
        info!(
            target: DISPATCH_TARGET,
            min_workers = settings.min_workers,
            max_workers = settings.max_workers,
            queue_capacity = settings.queue_capacity,
            "worker pool started"
        );
        dispatcher
    }

    /// Pool sizing.
    #[must_use]
    pub fn settings(&self) -> &WorkerPoolSettings {
        &self.shared.settings
    }

    /// Number of live worker threads.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.shared.state().workers
    }

    /// Number of admitted jobs that have not finished.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.shared.state().in_flight
    }

    /// Number of admitted jobs still waiting for a worker.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.receiver.len()
    }

    /// Offers `job` to the pool without blocking.
    ///
    /// Refused jobs are returned with the reason so the caller can apply a
    /// policy.
    fn admit(&self, job: Box<dyn Job>) -> Result<(), (Box<dyn Job>, AdmissionRejected)> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = sender.as_ref() else {
            return Err((job, AdmissionRejected::ShuttingDown));
        };
        let mut state = self.shared.state();
        let limit = self.shared.settings.admission_limit();
        if state.in_flight >= limit {
            return Err((job, AdmissionRejected::Saturated { limit }));
        }
        if let Err(error) = sender.try_send(job) {
            let reason = match &error {
                TrySendError::Full(_) => AdmissionRejected::Saturated { limit },
                TrySendError::Disconnected(_) => AdmissionRejected::ShuttingDown,
            };
            return Err((error.into_inner(), reason));
        }
        state.in_flight += 1;
        if state.in_flight > state.workers && state.workers < self.shared.settings.max_workers {
            spawn_worker(&self.shared, &mut state);
        }
        Ok(())
    }

    /// Stops admission and waits for in-flight work to drain.
    ///
    /// Queued jobs still run. Returns `false` when workers were still busy
    /// after the shutdown grace period; they are left to finish on their own.
    pub fn shutdown(&self) -> bool {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_none() {
            return self.shared.state().workers == 0;
        }
        drop(sender);
        let grace = self.shared.settings.shutdown_grace;
        let state = self.shared.state();
        let (state, timeout) = self
            .shared
            .workers_exited
            .wait_timeout_while(state, grace, |state| state.workers > 0)
            .unwrap_or_else(PoisonError::into_inner);
        if timeout.timed_out() {
            warn!(
                target: DISPATCH_TARGET,
                workers = state.workers,
                in_flight = state.in_flight,
                grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
                "worker pool did not drain within the shutdown grace period"
            );
            return false;
        }
        info!(target: DISPATCH_TARGET, "worker pool stopped");
        true
    }
}

impl ExecutionStrategy for RequestDispatcher {
    fn execute(&self, job: Box<dyn Job>) -> Result<(), AdmissionRejected> {
        self.admit(job).map_err(|(job, reason)| {
            self.policy.handle(job, &reason);
            reason
        })
    }
}

impl Drop for RequestDispatcher {
    fn drop(&mut self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

fn spawn_worker(shared: &Arc<Shared>, state: &mut PoolState) {
    let id = shared.next_id.fetch_add(1, Ordering::Relaxed);
    let worker_shared = Arc::clone(shared);
    let spawned = thread::Builder::new()
        .name(format!("gantry-worker-{id}"))
        .spawn(move || run_worker(&worker_shared, id));
    match spawned {
        Ok(_) => state.workers += 1,
        Err(error) => warn!(
            target: DISPATCH_TARGET,
            error = %error,
            workers = state.workers,
            "failed to spawn worker thread"
        ),
    }
}

fn run_worker(shared: &Shared, id: usize) {
    let idle = shared.settings.idle_timeout.max(MIN_IDLE_POLL);
    loop {
        match shared.receiver.recv_timeout(idle) {
            Ok(job) => {
                run_contained(job);
                shared.state().in_flight -= 1;
            }
            Err(RecvTimeoutError::Timeout) => {
                let state = shared.state();
                if state.workers > shared.settings.min_workers && state.in_flight < state.workers {
                    debug!(target: DISPATCH_TARGET, worker = id, "idle worker retiring");
                    retire(shared, state);
                    return;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                retire(shared, shared.state());
                return;
            }
        }
    }
}

fn retire(shared: &Shared, mut state: MutexGuard<'_, PoolState>) {
    state.workers -= 1;
    drop(state);
    shared.workers_exited.notify_all();
}
