//! Shared configuration for the Gantry service front-end.
//!
//! [`Config`] is an immutable value describing the listener (port, bind host,
//! TLS), the root storage directory, the request worker pool sizing and the
//! telemetry settings. It is resolved from command-line flags, each of which
//! may also be supplied through a `GANTRY_*` environment variable.

mod defaults;
mod logging;
mod tls;

use std::ffi::OsString;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_BIND_HOST, DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_LOG_FILTER, DEFAULT_MAX_WORKERS,
    DEFAULT_MIN_WORKERS, DEFAULT_PORT, DEFAULT_QUEUE_CAPACITY, DEFAULT_ROOT_PATH,
    DEFAULT_SHUTDOWN_GRACE_SECS, DEFAULT_TLS_PARAMETERS, default_log_filter, default_log_format,
    default_worker_pool,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use tls::{ClientAuth, ClientAuthParseError, TlsSettings};

/// Name of the subdirectory of the root path holding uploaded files.
pub const FILES_DIRECTORY: &str = "files";

/// Sizing of the bounded request worker pool.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct WorkerPoolSettings {
    /// Workers kept alive even when idle.
    pub min_workers: usize,
    /// Ceiling on concurrently running workers.
    pub max_workers: usize,
    /// Pending items held once every worker is busy.
    pub queue_capacity: usize,
    /// Idle time after which workers above the minimum exit.
    pub idle_timeout: Duration,
    /// Upper bound on how long shutdown waits for in-flight work.
    pub shutdown_grace: Duration,
}

impl WorkerPoolSettings {
    /// Largest number of accepted items that may be pending at once.
    #[must_use]
    pub const fn admission_limit(&self) -> usize {
        self.max_workers.saturating_add(self.queue_capacity)
    }

    /// Checks the sizing invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.min_workers > self.max_workers {
            return Err(ConfigError::WorkerRange {
                min: self.min_workers,
                max: self.max_workers,
            });
        }
        Ok(())
    }
}

impl Default for WorkerPoolSettings {
    fn default() -> Self {
        default_worker_pool()
    }
}

/// Resolved service configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Config {
    /// Listening port; `0` disables the network listener.
    pub port: u16,
    /// Address the listener binds to.
    pub bind_host: String,
    /// TLS settings, consulted only when `tls.enabled` is set.
    pub tls: TlsSettings,
    /// Root storage directory.
    pub root_path: Utf8PathBuf,
    /// Whether start-up creates the root directory and its `files` child.
    pub make_directories: bool,
    /// Request worker pool sizing.
    pub workers: WorkerPoolSettings,
    /// `tracing` filter expression.
    pub log_filter: String,
    /// Log output format.
    pub log_format: LogFormat,
    /// Single command to execute instead of serving.
    pub command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_host: DEFAULT_BIND_HOST.to_owned(),
            tls: TlsSettings::disabled(),
            root_path: Utf8PathBuf::from(DEFAULT_ROOT_PATH),
            make_directories: true,
            workers: default_worker_pool(),
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: default_log_format(),
            command: None,
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_iter(std::env::args_os())
    }

    /// Loads configuration from an explicit argument list.
    ///
    /// The first item is the program name, as with [`std::env::args_os`].
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let arguments = ConfigArgs::try_parse_from(args).map_err(ConfigError::Arguments)?;
        let config = Self::from(arguments);
        config.workers.validate()?;
        Ok(config)
    }

    /// Listening port; `0` disables the listener.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Whether a network listener should be opened at all.
    #[must_use]
    pub const fn listener_enabled(&self) -> bool {
        self.port > 0
    }

    /// Root storage directory.
    #[must_use]
    pub fn root_path(&self) -> &camino::Utf8Path {
        self.root_path.as_path()
    }

    /// Directory holding uploaded files below the root.
    #[must_use]
    pub fn files_path(&self) -> Utf8PathBuf {
        self.root_path.join(FILES_DIRECTORY)
    }

    /// TLS settings.
    #[must_use]
    pub const fn tls(&self) -> &TlsSettings {
        &self.tls
    }

    /// Worker pool sizing.
    #[must_use]
    pub const fn workers(&self) -> &WorkerPoolSettings {
        &self.workers
    }

    /// `tracing` filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Single command requested on the command line, if any.
    #[must_use]
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }
}

/// Errors raised while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The command line could not be parsed.
    #[error("{0}")]
    Arguments(#[source] clap::Error),
    /// The pool was configured without any workers.
    #[error("the worker pool needs at least one worker")]
    NoWorkers,
    /// The minimum worker count exceeds the maximum.
    #[error("minimum workers ({min}) exceed maximum workers ({max})")]
    WorkerRange { min: usize, max: usize },
}

#[derive(Debug, Parser)]
#[command(name = "gantryd", about = "Serve requests over TCP or TLS.", version)]
struct ConfigArgs {
    /// Listening port; 0 disables the network listener.
    #[arg(short = 'p', long, env = "GANTRY_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Address the listener binds to.
    #[arg(long, env = "GANTRY_BIND_HOST", default_value = DEFAULT_BIND_HOST)]
    bind_host: String,
    /// Wrap connections in TLS.
    #[arg(long, env = "GANTRY_HTTPS")]
    https: bool,
    /// Client certificate policy: none, optional or required.
    #[arg(long, env = "GANTRY_CLIENT_AUTH", default_value_t = ClientAuth::None)]
    client_auth: ClientAuth,
    /// Name of the TLS parameter set.
    #[arg(long, env = "GANTRY_TLS_PARAMETERS", default_value = DEFAULT_TLS_PARAMETERS)]
    tls_parameters: String,
    /// PEM certificate chain presented by the TLS listener.
    #[arg(long, env = "GANTRY_CERTIFICATE")]
    certificate: Option<Utf8PathBuf>,
    /// PEM private key for the certificate.
    #[arg(long, env = "GANTRY_PRIVATE_KEY")]
    private_key: Option<Utf8PathBuf>,
    /// PEM roots trusted for client certificates.
    #[arg(long, env = "GANTRY_CLIENT_CA")]
    client_ca: Option<Utf8PathBuf>,
    /// Root storage directory.
    #[arg(short = 'd', long, env = "GANTRY_ROOT_PATH", default_value = DEFAULT_ROOT_PATH)]
    root_path: Utf8PathBuf,
    /// Do not create the root directory and its files subdirectory.
    #[arg(short = 'o', long, env = "GANTRY_OMIT_DIRECTORIES")]
    omit_directories: bool,
    /// Workers kept alive even when idle.
    #[arg(long, env = "GANTRY_MIN_WORKERS", default_value_t = DEFAULT_MIN_WORKERS)]
    min_workers: usize,
    /// Ceiling on concurrently running workers.
    #[arg(long, env = "GANTRY_MAX_WORKERS", default_value_t = DEFAULT_MAX_WORKERS)]
    max_workers: usize,
    /// Pending requests held once every worker is busy.
    #[arg(long, env = "GANTRY_QUEUE_CAPACITY", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,
    /// Seconds an extra worker may idle before it exits.
    #[arg(long, env = "GANTRY_IDLE_TIMEOUT_SECS", default_value_t = DEFAULT_IDLE_TIMEOUT_SECS)]
    idle_timeout_secs: u64,
    /// Seconds shutdown waits for in-flight requests.
    #[arg(
        long,
        env = "GANTRY_SHUTDOWN_GRACE_SECS",
        default_value_t = DEFAULT_SHUTDOWN_GRACE_SECS
    )]
    shutdown_grace_secs: u64,
    /// Log filter expression.
    #[arg(long, env = "GANTRY_LOG_FILTER", default_value = DEFAULT_LOG_FILTER)]
    log_filter: String,
    /// Log format: json or compact.
    #[arg(long, env = "GANTRY_LOG_FORMAT", default_value_t = LogFormat::Json)]
    log_format: LogFormat,
    /// Run a single command, write its output to stdout and exit.
    #[arg(short = 'c', long)]
    command: Option<String>,
}

impl From<ConfigArgs> for Config {
    fn from(args: ConfigArgs) -> Self {
        Self {
            port: args.port,
            bind_host: args.bind_host,
            tls: TlsSettings {
                enabled: args.https,
                client_auth: args.client_auth,
                parameters: args.tls_parameters,
                certificate: args.certificate,
                private_key: args.private_key,
                client_ca: args.client_ca,
            },
            root_path: args.root_path,
            make_directories: !args.omit_directories,
            workers: WorkerPoolSettings {
                min_workers: args.min_workers,
                max_workers: args.max_workers,
                queue_capacity: args.queue_capacity,
                idle_timeout: Duration::from_secs(args.idle_timeout_secs),
                shutdown_grace: Duration::from_secs(args.shutdown_grace_secs),
            },
            log_filter: args.log_filter,
            log_format: args.log_format,
            command: args.command,
        }
    }
}
