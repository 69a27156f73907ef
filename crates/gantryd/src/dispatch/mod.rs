//! Bounded request dispatch.
//!
//! Accepted connections become [`WorkItem`]s and are handed to an
//! [`ExecutionStrategy`]. The pooled [`RequestDispatcher`] runs them on a
//! bounded set of worker threads with a bounded queue; anything beyond that
//! is rejected synchronously and passed to a [`RejectionPolicy`].
//! [`ImmediateExecution`] runs jobs on the calling thread instead and backs
//! the single-command path.

mod errors;
mod execution;
mod job;
mod pool;
mod rejection;

pub use self::errors::{AdmissionRejected, HandlerError};
pub use self::execution::{ExecutionStrategy, ImmediateExecution};
pub use self::job::{Job, WorkItem};
pub use self::pool::RequestDispatcher;
pub use self::rejection::{CloseAndWarn, RejectionPolicy};

pub(crate) use self::execution::run_contained;

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
