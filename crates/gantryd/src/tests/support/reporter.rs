//! Test double for [`HealthReporter`] that records lifecycle events for
//! assertions.

use std::net::SocketAddr;
use std::sync::Mutex;

use gantry_config::Config;

use crate::health::HealthReporter;
use crate::service::StartError;

/// Lifecycle events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    /// Start-up began.
    Starting,
    /// Start-up finished; `listening` is false in no-listener mode.
    Started { listening: bool },
    /// Start-up failed with an error description.
    StartFailed(String),
    /// The service was torn down.
    Stopped,
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn service_starting(&self, _config: &Config) {
        self.record(HealthEvent::Starting);
    }

    fn service_started(&self, address: Option<SocketAddr>) {
        self.record(HealthEvent::Started {
            listening: address.is_some(),
        });
    }

    fn service_start_failed(&self, _config: &Config, error: &StartError) {
        self.record(HealthEvent::StartFailed(error.to_string()));
    }

    fn service_stopped(&self) {
        self.record(HealthEvent::Stopped);
    }
}
