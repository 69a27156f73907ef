//! Test suites for the Gantry service.

mod behaviour;
mod support;
