use std::time::Duration;

/// Port used when none is configured.
pub const DEFAULT_PORT: u16 = 80;

/// Address the listener binds to by default.
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

/// Root storage directory used when none is configured.
pub const DEFAULT_ROOT_PATH: &str = "GantryRoot";

/// Name of the TLS parameter set resolved when none is configured.
pub const DEFAULT_TLS_PARAMETERS: &str = "default";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Workers kept alive even when idle.
pub const DEFAULT_MIN_WORKERS: usize = 5;

/// Ceiling on concurrently running workers.
pub const DEFAULT_MAX_WORKERS: usize = 100;

/// Pending items held once every worker is busy.
pub const DEFAULT_QUEUE_CAPACITY: usize = 2;

/// Seconds a burst worker may sit idle before it is reclaimed.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 10;

/// Seconds shutdown waits for in-flight work.
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 10;

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binaries.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Default sizing of the request worker pool.
pub fn default_worker_pool() -> crate::WorkerPoolSettings {
    crate::WorkerPoolSettings {
        min_workers: DEFAULT_MIN_WORKERS,
        max_workers: DEFAULT_MAX_WORKERS,
        queue_capacity: DEFAULT_QUEUE_CAPACITY,
        idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
    }
}
