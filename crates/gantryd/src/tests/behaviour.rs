//! Behavioural tests for the service lifecycle.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use super::support::{self, HealthEvent, LifecycleWorld, request, response_body};

#[fixture]
fn world() -> RefCell<LifecycleWorld> {
    support::world()
}

#[given("a service configured on a free port")]
fn given_free_port(world: &RefCell<LifecycleWorld>) {
    assert_ne!(world.borrow().config.port, 0);
}

#[given("a service configured on an occupied port")]
fn given_occupied_port(world: &RefCell<LifecycleWorld>) {
    world.borrow_mut().occupy_port();
}

#[given("a service configured without a listener")]
fn given_no_listener(world: &RefCell<LifecycleWorld>) {
    world.borrow_mut().config.port = 0;
}

#[given("directory preparation is disabled")]
fn given_no_directories(world: &RefCell<LifecycleWorld>) {
    world.borrow_mut().service().dont_make_dirs();
}

#[when("the service starts")]
fn when_service_starts(world: &RefCell<LifecycleWorld>) {
    world.borrow_mut().start();
}

#[when("the service stops")]
fn when_service_stops(world: &RefCell<LifecycleWorld>) {
    world.borrow_mut().stop();
}

#[then("start-up succeeds")]
fn then_start_succeeds(world: &RefCell<LifecycleWorld>) {
    assert_eq!(world.borrow().start_results.last(), Some(&true));
}

#[then("start-up fails")]
fn then_start_fails(world: &RefCell<LifecycleWorld>) {
    assert_eq!(world.borrow().start_results.last(), Some(&false));
}

#[then("the second start-up fails")]
fn then_second_start_fails(world: &RefCell<LifecycleWorld>) {
    assert_eq!(world.borrow().start_results, vec![true, false]);
    let events = world.borrow().reporter.events();
    assert!(
        events
            .iter()
            .any(|event| matches!(event, HealthEvent::StartFailed(message) if message.contains("already running"))),
        "expected an already-running failure, got {events:?}"
    );
}

#[then("the service is running")]
fn then_running(world: &RefCell<LifecycleWorld>) {
    let world = world.borrow();
    assert!(world.is_running());
    assert!(world.address().is_some());
}

#[then("the service is not running")]
fn then_not_running(world: &RefCell<LifecycleWorld>) {
    let world = world.borrow();
    assert!(!world.is_running());
    assert!(world.address().is_none());
}

#[then("a client can fetch a stored file")]
fn then_client_fetches(world: &RefCell<LifecycleWorld>) {
    let world = world.borrow();
    std::fs::write(world.config.files_path().join("hello.txt"), "hello, gantry")
        .expect("write stored file");
    let address = world.address().expect("listener address");
    let reply = request(address, "GET /files/hello.txt HTTP/1.1\r\n\r\n");
    assert!(reply.starts_with(b"HTTP/1.1 200 OK\r\n"));
    assert_eq!(response_body(&reply), b"hello, gantry");
}

#[then("the reporter saw starting, started and stopped")]
fn then_reporter_saw_lifecycle(world: &RefCell<LifecycleWorld>) {
    assert_eq!(
        world.borrow().reporter.events(),
        vec![
            HealthEvent::Starting,
            HealthEvent::Started { listening: true },
            HealthEvent::Stopped,
        ]
    );
}

#[then("the failure names the occupied port")]
fn then_failure_names_port(world: &RefCell<LifecycleWorld>) {
    let world = world.borrow();
    let port = world.config.port.to_string();
    let events = world.reporter.events();
    assert!(
        events
            .iter()
            .any(|event| matches!(event, HealthEvent::StartFailed(message) if message.contains(&port))),
        "expected a bind failure naming port {port}, got {events:?}"
    );
}

#[then("the storage directories exist")]
fn then_directories_exist(world: &RefCell<LifecycleWorld>) {
    assert!(world.borrow().config.files_path().is_dir());
}

#[then("the storage directories do not exist")]
fn then_directories_absent(world: &RefCell<LifecycleWorld>) {
    assert!(!world.borrow().config.root_path().exists());
}

#[scenario(
    path = "tests/features/service_lifecycle.feature",
    name = "Starting and stopping on a free port"
)]
fn start_and_stop_on_free_port(world: RefCell<LifecycleWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/service_lifecycle.feature",
    name = "Starting on a port that is already bound"
)]
fn start_on_occupied_port(world: RefCell<LifecycleWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/service_lifecycle.feature",
    name = "Stopping a service that never started"
)]
fn stop_before_start(world: RefCell<LifecycleWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/service_lifecycle.feature",
    name = "Starting without a network listener"
)]
fn start_without_listener(world: RefCell<LifecycleWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/service_lifecycle.feature",
    name = "Starting with directory preparation disabled"
)]
fn start_without_directories(world: RefCell<LifecycleWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/service_lifecycle.feature",
    name = "Starting twice while running"
)]
fn start_twice(world: RefCell<LifecycleWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/service_lifecycle.feature",
    name = "Restarting after a stop"
)]
fn restart_after_stop(world: RefCell<LifecycleWorld>) {
    drop(world);
}
