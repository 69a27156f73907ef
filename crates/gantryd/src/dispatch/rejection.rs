//! Overload handling for refused jobs.

use tracing::warn;

use super::{AdmissionRejected, DISPATCH_TARGET, Job};

/// Decides what happens to a job the dispatcher refused.
pub trait RejectionPolicy: Send + Sync {
    /// Disposes of `job`, which was refused for `reason`.
    fn handle(&self, job: Box<dyn Job>, reason: &AdmissionRejected);
}

/// Logs a warning and closes the connection without a response.
#[derive(Debug, Default, Clone, Copy)]
pub struct CloseAndWarn;

impl RejectionPolicy for CloseAndWarn {
    fn handle(&self, job: Box<dyn Job>, reason: &AdmissionRejected) {
        warn!(
            target: DISPATCH_TARGET,
            job = %job.describe(),
            reason = %reason,
            "could not handle request; worker pool is exhausted"
        );
        job.abandon();
    }
}
