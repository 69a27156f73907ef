//! BDD test world: owns the scratch root, the service under test and the
//! recorded lifecycle events.

use std::cell::RefCell;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

use camino::Utf8PathBuf;
use gantry_config::Config;
use tempfile::TempDir;

use crate::files::FilesExpediter;
use crate::service::Service;

use super::client::free_port;
use super::reporter::RecordingHealthReporter;

/// Scenario world shared across BDD steps.
pub struct LifecycleWorld {
    _scratch: TempDir,
    pub config: Config,
    pub reporter: Arc<RecordingHealthReporter>,
    service: Option<Service>,
    pub start_results: Vec<bool>,
    occupant: Option<TcpListener>,
}

impl LifecycleWorld {
    /// Builds a world whose service would listen on a free loopback port.
    #[must_use]
    pub fn new() -> Self {
        let scratch = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(scratch.path().join("GantryRoot"))
            .expect("utf8 temp dir");
        let mut config = Config {
            port: free_port(),
            bind_host: "127.0.0.1".to_owned(),
            root_path: root,
            ..Config::default()
        };
        config.workers.min_workers = 1;
        config.workers.max_workers = 4;
        Self {
            _scratch: scratch,
            config,
            reporter: Arc::new(RecordingHealthReporter::default()),
            service: None,
            start_results: Vec::new(),
            occupant: None,
        }
    }

    /// Binds the configured port so the service cannot take it.
    pub fn occupy_port(&mut self) {
        let occupant = TcpListener::bind(("127.0.0.1", 0)).expect("bind occupant");
        self.config.port = occupant.local_addr().expect("occupant address").port();
        self.occupant = Some(occupant);
    }

    /// Service under test, built from the current configuration on first use.
    pub fn service(&mut self) -> &Service {
        let config = &self.config;
        let reporter = &self.reporter;
        self.service.get_or_insert_with(|| {
            let expediter = Arc::new(FilesExpediter::new(config.files_path()));
            Service::new(config.clone(), expediter).with_reporter(reporter.clone())
        })
    }

    pub fn start(&mut self) {
        let started = self.service().start();
        self.start_results.push(started);
    }

    pub fn stop(&mut self) {
        self.service().stop();
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.service.as_ref().is_some_and(Service::is_running)
    }

    #[must_use]
    pub fn address(&self) -> Option<SocketAddr> {
        self.service.as_ref().and_then(Service::local_addr)
    }
}

impl Drop for LifecycleWorld {
    fn drop(&mut self) {
        if let Some(service) = self.service.take() {
            service.stop();
        }
        self.occupant = None;
    }
}

/// Fresh world for one scenario.
#[must_use]
pub fn world() -> RefCell<LifecycleWorld> {
    RefCell::new(LifecycleWorld::new())
}
