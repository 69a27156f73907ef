//! Launch sequencing for the `gantryd` binary.

use std::io::{self, Write};
use std::sync::Arc;

use tracing::info;

use gantry_config::Config;

use crate::files::FilesExpediter;
use crate::pipeline::Expediter;
use crate::service::Service;
use crate::telemetry;

use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};
use super::PROCESS_TARGET;

/// Runs the service with the production collaborators.
///
/// Serves files below the configured root, writes single-command output to
/// stdout and waits for a termination signal before stopping.
pub fn run(config: Config) -> Result<(), LaunchError> {
    telemetry::initialise(&config)?;
    let expediter: Arc<dyn Expediter> = Arc::new(FilesExpediter::new(config.files_path()));
    let mut stdout = io::stdout().lock();
    run_with(config, expediter, &SystemShutdownSignal, &mut stdout)
}

/// Runs the service with injected collaborators.
///
/// With a command configured the command runs once and its output goes to
/// `out`; no listener is opened. Otherwise the service starts, `shutdown`
/// is awaited and the service is stopped.
pub fn run_with<S, W>(
    config: Config,
    expediter: Arc<dyn Expediter>,
    shutdown: &S,
    out: &mut W,
) -> Result<(), LaunchError>
where
    S: ShutdownSignal + ?Sized,
    W: Write + ?Sized,
{
    let command = config.command.clone();
    let service = Service::new(config, expediter);
    if let Some(command) = command {
        info!(target: PROCESS_TARGET, command = %command, "executing single command");
        service.execute_single_command(&command, out)?;
        return Ok(());
    }

    service.try_start()?;
    info!(target: PROCESS_TARGET, "service running; waiting for shutdown signal");
    let waited = shutdown.wait();
    if let Ok(cause) = &waited {
        info!(
            target: PROCESS_TARGET,
            cause = %cause,
            grace_ms = u64::try_from(service.config().workers().shutdown_grace.as_millis())
                .unwrap_or(u64::MAX),
            "stopping service"
        );
    }
    service.stop();
    waited?;
    info!(target: PROCESS_TARGET, "service shut down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use gantry_http::{Request, Response};
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use crate::command::CommandExecutionError;
    use crate::process::{ShutdownCause, ShutdownError};
    use crate::service::StartError;

    struct ImmediateShutdown {
        waited: AtomicBool,
    }

    impl ShutdownSignal for ImmediateShutdown {
        fn wait(&self) -> Result<ShutdownCause, ShutdownError> {
            self.waited.store(true, Ordering::SeqCst);
            Ok(ShutdownCause::Terminate)
        }
    }

    #[fixture]
    fn scratch() -> TempDir {
        tempfile::tempdir().expect("temp dir")
    }

    fn config_in(dir: &TempDir) -> Config {
        Config {
            port: 0,
            bind_host: "127.0.0.1".to_owned(),
            root_path: camino::Utf8PathBuf::from_path_buf(dir.path().join("root"))
                .expect("utf8 temp dir"),
            ..Config::default()
        }
    }

    fn expediter() -> Arc<dyn Expediter> {
        Arc::new(|request: &Request| match request.resource() {
            "/FrontPage" => Response::ok().with_body("front page"),
            _ => Response::error(404, "missing"),
        })
    }

    #[rstest]
    fn command_mode_writes_body_without_waiting(scratch: TempDir) {
        let config = Config {
            command: Some("/FrontPage".to_owned()),
            ..config_in(&scratch)
        };
        let shutdown = ImmediateShutdown {
            waited: AtomicBool::new(false),
        };
        let mut out = Vec::new();
        run_with(config, expediter(), &shutdown, &mut out).expect("command should succeed");
        assert_eq!(out, b"front page");
        assert!(!shutdown.waited.load(Ordering::SeqCst));
    }

    #[rstest]
    fn failing_command_surfaces_status(scratch: TempDir) {
        let config = Config {
            command: Some("/Nowhere".to_owned()),
            ..config_in(&scratch)
        };
        let shutdown = ImmediateShutdown {
            waited: AtomicBool::new(false),
        };
        let error = run_with(config, expediter(), &shutdown, &mut Vec::new())
            .expect_err("missing page should fail");
        assert!(matches!(
            error,
            LaunchError::Command {
                source: CommandExecutionError::Status { status: 404 }
            }
        ));
    }

    #[rstest]
    fn serving_mode_waits_for_shutdown(scratch: TempDir) {
        let shutdown = ImmediateShutdown {
            waited: AtomicBool::new(false),
        };
        run_with(config_in(&scratch), expediter(), &shutdown, &mut Vec::new())
            .expect("service should run");
        assert!(shutdown.waited.load(Ordering::SeqCst));
        assert!(scratch.path().join("root/files").is_dir());
    }

    #[rstest]
    fn occupied_port_fails_launch(scratch: TempDir) {
        let occupant = std::net::TcpListener::bind(("127.0.0.1", 0)).expect("bind occupant");
        let port = occupant.local_addr().expect("occupant address").port();
        let config = Config {
            port,
            ..config_in(&scratch)
        };
        let shutdown = ImmediateShutdown {
            waited: AtomicBool::new(false),
        };
        let error = run_with(config, expediter(), &shutdown, &mut Vec::new())
            .expect_err("bind should fail");
        assert!(matches!(
            error,
            LaunchError::Start {
                source: StartError::Listener(_)
            }
        ));
        assert!(!shutdown.waited.load(Ordering::SeqCst));
    }
}
