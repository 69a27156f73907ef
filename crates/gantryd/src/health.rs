//! Structured health reporting for service lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use gantry_config::Config;

use crate::service::StartError;
use crate::transport::SocketError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before the service starts.
    fn service_starting(&self, config: &Config);

    /// Invoked once the service is up. `address` is `None` when no listener
    /// was requested.
    fn service_started(&self, address: Option<SocketAddr>);

    /// Invoked when start-up fails.
    fn service_start_failed(&self, config: &Config, error: &StartError);

    /// Invoked after a running service has been torn down.
    fn service_stopped(&self);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn service_starting(&self, config: &Config) {
        (**self).service_starting(config);
    }

    fn service_started(&self, address: Option<SocketAddr>) {
        (**self).service_started(address);
    }

    fn service_start_failed(&self, config: &Config, error: &StartError) {
        (**self).service_start_failed(config, error);
    }

    fn service_stopped(&self) {
        (**self).service_stopped();
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn service_starting(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "service_starting",
            port = config.port(),
            bind_host = %config.bind_host,
            tls = config.tls().enabled,
            root_path = %config.root_path(),
            "starting service"
        );
    }

    fn service_started(&self, address: Option<SocketAddr>) {
        match address {
            Some(address) => tracing::info!(
                target: HEALTH_TARGET,
                event = "service_started",
                address = %address,
                "service listening"
            ),
            None => tracing::info!(
                target: HEALTH_TARGET,
                event = "service_started",
                "service started without a network listener"
            ),
        }
    }

    fn service_start_failed(&self, config: &Config, error: &StartError) {
        if let StartError::Listener(SocketError::Bind { port, source }) = error {
            tracing::error!(
                target: HEALTH_TARGET,
                event = "service_start_failed",
                error = %source,
                "service cannot be started"
            );
            tracing::error!(
                target: HEALTH_TARGET,
                event = "service_start_failed",
                port = *port,
                "port {port} is already in use"
            );
            tracing::error!(
                target: HEALTH_TARGET,
                event = "service_start_failed",
                "use the -p <port#> command line argument to use a different port"
            );
            return;
        }
        tracing::error!(
            target: HEALTH_TARGET,
            event = "service_start_failed",
            port = config.port(),
            error = %error,
            detail = ?error,
            "service failed to start"
        );
    }

    fn service_stopped(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "service_stopped",
            "service stopped"
        );
    }
}
