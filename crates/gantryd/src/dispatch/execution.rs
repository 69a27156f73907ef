//! Execution strategies for jobs.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::{error, warn};

use super::{AdmissionRejected, DISPATCH_TARGET, HandlerError, Job};

/// Runs jobs somewhere: inline, or on a pool.
pub trait ExecutionStrategy: Send + Sync {
    /// Takes ownership of `job` and arranges for it to run exactly once.
    ///
    /// A rejected job has already been handed to the strategy's rejection
    /// policy when this returns `Err`.
    fn execute(&self, job: Box<dyn Job>) -> Result<(), AdmissionRejected>;
}

/// Runs each job on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateExecution;

impl ExecutionStrategy for ImmediateExecution {
    fn execute(&self, job: Box<dyn Job>) -> Result<(), AdmissionRejected> {
        run_contained(job);
        Ok(())
    }
}

/// Runs `job`, logging failures and containing panics.
pub(crate) fn run_contained(job: Box<dyn Job>) {
    let description = job.describe();
    let outcome = panic::catch_unwind(AssertUnwindSafe(move || job.run()))
        .unwrap_or_else(|payload| {
            Err(HandlerError::Panicked {
                message: panic_message(payload.as_ref()),
            })
        });
    match outcome {
        Ok(()) => {}
        Err(failure @ HandlerError::Panicked { .. }) => error!(
            target: DISPATCH_TARGET,
            job = %description,
            error = %failure,
            "job panicked"
        ),
        Err(failure) => warn!(
            target: DISPATCH_TARGET,
            job = %description,
            error = %failure,
            "job failed"
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}
