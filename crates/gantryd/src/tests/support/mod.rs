//! Test harness utilities for the service lifecycle suites.

mod client;
mod reporter;
mod world;

pub use client::{free_port, request, response_body, try_request};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use world::{LifecycleWorld, world};
