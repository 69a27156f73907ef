//! Command-line resolution of the service configuration.

use std::time::Duration;

use camino::Utf8PathBuf;
use rstest::rstest;

use gantry_config::{
    ClientAuth, Config, ConfigError, DEFAULT_PORT, DEFAULT_ROOT_PATH, DEFAULT_TLS_PARAMETERS,
    LogFormat, default_log_filter, default_worker_pool,
};

fn load(args: &[&str]) -> Result<Config, ConfigError> {
    Config::load_from_iter(std::iter::once("gantryd").chain(args.iter().copied()))
}

#[rstest]
fn bare_invocation_applies_defaults() {
    let config = load(&[]).expect("defaults should load");
    assert_eq!(config.port(), DEFAULT_PORT);
    assert!(!config.tls().enabled);
    assert_eq!(config.tls().parameters, DEFAULT_TLS_PARAMETERS);
    assert_eq!(config.root_path().as_str(), DEFAULT_ROOT_PATH);
    assert!(config.make_directories);
    assert_eq!(config.workers(), &default_worker_pool());
    assert_eq!(config.log_filter(), default_log_filter());
    assert!(config.command().is_none());
}

#[rstest]
#[case(&["-p", "9123"], 9123)]
#[case(&["--port", "0"], 0)]
fn port_flag_overrides_default(#[case] args: &[&str], #[case] expected: u16) {
    let config = load(args).expect("port flag should parse");
    assert_eq!(config.port(), expected);
    assert_eq!(config.listener_enabled(), expected > 0);
}

#[rstest]
fn tls_flags_populate_settings() {
    let config = load(&[
        "--https",
        "--client-auth",
        "optional",
        "--tls-parameters",
        "modern",
        "--certificate",
        "/etc/gantry/cert.pem",
        "--private-key",
        "/etc/gantry/key.pem",
        "--client-ca",
        "/etc/gantry/ca.pem",
    ])
    .expect("tls flags should parse");
    let tls = config.tls();
    assert!(tls.enabled);
    assert_eq!(tls.client_auth, ClientAuth::Optional);
    assert_eq!(tls.parameters, "modern");
    assert_eq!(
        tls.certificate.as_ref().map(|path| path.as_str()),
        Some("/etc/gantry/cert.pem")
    );
    assert!(tls.client_ca.is_some());
}

#[rstest]
fn omit_directories_disables_preparation() {
    let config = load(&["-o", "-d", "/srv/wiki"]).expect("flags should parse");
    assert!(!config.make_directories);
    assert_eq!(config.files_path(), Utf8PathBuf::from("/srv/wiki/files"));
}

#[rstest]
fn worker_pool_flags_are_applied() {
    let config = load(&[
        "--min-workers",
        "1",
        "--max-workers",
        "3",
        "--queue-capacity",
        "4",
        "--idle-timeout-secs",
        "2",
        "--shutdown-grace-secs",
        "1",
    ])
    .expect("pool flags should parse");
    let workers = config.workers();
    assert_eq!(workers.min_workers, 1);
    assert_eq!(workers.max_workers, 3);
    assert_eq!(workers.admission_limit(), 7);
    assert_eq!(workers.idle_timeout, Duration::from_secs(2));
    assert_eq!(workers.shutdown_grace, Duration::from_secs(1));
}

#[rstest]
fn command_and_log_flags_are_captured() {
    let config = load(&["--log-format", "compact", "-c", "/FrontPage?format=text"])
        .expect("flags should parse");
    assert_eq!(config.log_format(), LogFormat::Compact);
    assert_eq!(config.command(), Some("/FrontPage?format=text"));
}

#[rstest]
#[case(&["--client-auth", "sometimes"])]
#[case(&["--port", "70000"])]
#[case(&["--log-format", "xml"])]
fn malformed_flags_fail_fast(#[case] args: &[&str]) {
    let error = load(args).expect_err("invalid flag should fail");
    assert!(matches!(error, ConfigError::Arguments(_)));
}

#[rstest]
fn inverted_worker_range_is_rejected() {
    let error = load(&["--min-workers", "9", "--max-workers", "2"])
        .expect_err("inverted range should fail");
    assert!(matches!(error, ConfigError::WorkerRange { min: 9, max: 2 }));
}

#[rstest]
fn zero_max_workers_is_rejected() {
    let error = load(&["--min-workers", "0", "--max-workers", "0"])
        .expect_err("empty pool should fail");
    assert!(matches!(error, ConfigError::NoWorkers));
}
