//! Tests for the connection acceptor.

use std::io::Read;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use gantry_config::Config;
use rstest::{fixture, rstest};

use crate::dispatch::{ExecutionStrategy, ImmediateExecution};

use super::test_utils::CountingHandler;
use super::{
    AcceptorError, AcceptorPhase, ConnectionAcceptor, ConnectionHandler, SocketFactory,
    TlsParameterRegistry,
};

#[derive(Clone)]
struct CountingFixture {
    count: Arc<AtomicUsize>,
    handler: Arc<CountingHandler>,
}

#[fixture]
fn counting_fixture() -> CountingFixture {
    let (count, handler) = CountingHandler::new();
    CountingFixture { count, handler }
}

fn acceptor_with(handler: Arc<dyn ConnectionHandler>) -> ConnectionAcceptor {
    let config = Config {
        port: 0,
        bind_host: "127.0.0.1".to_owned(),
        ..Config::default()
    };
    let registry = TlsParameterRegistry::default();
    let listener = SocketFactory::new(&registry)
        .create_listener(&config)
        .expect("bind listener");
    let executor: Arc<dyn ExecutionStrategy> = Arc::new(ImmediateExecution);
    ConnectionAcceptor::new(listener, executor, handler)
}

fn wait_for_count(count: &AtomicUsize, expected: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if count.load(Ordering::SeqCst) >= expected {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

#[rstest]
fn accepts_connections_until_stopped(counting_fixture: CountingFixture) {
    let CountingFixture { count, handler } = counting_fixture;
    let acceptor = acceptor_with(handler);
    let addr = acceptor.local_addr();
    assert_eq!(acceptor.phase(), AcceptorPhase::Idle);
    acceptor.start().expect("start acceptor");
    assert_eq!(acceptor.phase(), AcceptorPhase::Listening);

    let mut first = TcpStream::connect(addr).expect("connect first client");
    TcpStream::connect(addr).expect("connect second client");
    assert!(wait_for_count(&count, 2), "expected two connections");

    let mut remainder = Vec::new();
    first
        .read_to_end(&mut remainder)
        .expect("handler closes the connection");
    assert!(remainder.is_empty());

    acceptor.stop().expect("stop acceptor");
    assert_eq!(acceptor.phase(), AcceptorPhase::Stopped);
}

#[rstest]
fn start_twice_reports_already_listening(counting_fixture: CountingFixture) {
    let acceptor = acceptor_with(counting_fixture.handler);
    acceptor.start().expect("first start");
    assert!(matches!(
        acceptor.start(),
        Err(AcceptorError::AlreadyListening)
    ));
    acceptor.stop().expect("stop acceptor");
}

#[rstest]
fn stop_is_idempotent_and_terminal(counting_fixture: CountingFixture) {
    let acceptor = acceptor_with(counting_fixture.handler);
    acceptor.start().expect("start acceptor");
    acceptor.stop().expect("first stop");
    acceptor.stop().expect("second stop");
    assert!(matches!(acceptor.start(), Err(AcceptorError::Stopped)));
}

#[rstest]
fn stopping_idle_acceptor_releases_socket(counting_fixture: CountingFixture) {
    let acceptor = acceptor_with(counting_fixture.handler);
    let addr = acceptor.local_addr();
    acceptor.stop().expect("stop idle acceptor");
    assert_eq!(acceptor.phase(), AcceptorPhase::Stopped);
    assert!(
        std::net::TcpListener::bind(addr).is_ok(),
        "port should be free after stop"
    );
}

#[rstest]
fn concurrent_stops_racing_connections_do_not_hang(counting_fixture: CountingFixture) {
    let acceptor = Arc::new(acceptor_with(counting_fixture.handler));
    let addr = acceptor.local_addr();
    acceptor.start().expect("start acceptor");

    let client = thread::spawn(move || {
        for _ in 0..20 {
            if TcpStream::connect(addr).is_err() {
                break;
            }
        }
    });
    let stoppers: Vec<_> = (0..4)
        .map(|_| {
            let acceptor = Arc::clone(&acceptor);
            thread::spawn(move || acceptor.stop())
        })
        .collect();
    for stopper in stoppers {
        stopper
            .join()
            .expect("stopper thread")
            .expect("stop should not fault");
    }
    client.join().expect("client thread");
    assert_eq!(acceptor.phase(), AcceptorPhase::Stopped);
}
