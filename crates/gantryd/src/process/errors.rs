//! Error types for process supervision.

use thiserror::Error;

use crate::command::CommandExecutionError;
use crate::service::StartError;
use crate::telemetry::TelemetryError;

use super::shutdown::ShutdownError;

/// Errors surfaced while launching or supervising the service process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Telemetry could not be initialised.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The single command failed.
    #[error("{source}")]
    Command {
        /// Underlying command error.
        #[source]
        source: CommandExecutionError,
    },
    /// The service could not be started.
    #[error("failed to start service: {source}")]
    Start {
        /// Underlying start-up error.
        #[source]
        source: StartError,
    },
    /// Waiting for a shutdown signal failed.
    #[error("failed to wait for shutdown: {source}")]
    Shutdown {
        /// Underlying signal error.
        #[source]
        source: ShutdownError,
    },
}

impl From<TelemetryError> for LaunchError {
    fn from(source: TelemetryError) -> Self {
        Self::Telemetry { source }
    }
}

impl From<CommandExecutionError> for LaunchError {
    fn from(source: CommandExecutionError) -> Self {
        Self::Command { source }
    }
}

impl From<StartError> for LaunchError {
    fn from(source: StartError) -> Self {
        Self::Start { source }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}
