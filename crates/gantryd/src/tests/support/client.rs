//! Minimal blocking client helpers.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

/// Returns a loopback port that was free a moment ago.
#[must_use]
pub fn free_port() -> u16 {
    TcpListener::bind(("127.0.0.1", 0))
        .and_then(|listener| listener.local_addr())
        .expect("probe free port")
        .port()
}

/// Sends `raw` to `address` and reads until the server closes.
#[must_use]
pub fn request(address: SocketAddr, raw: &str) -> Vec<u8> {
    try_request(address, raw).expect("request should complete")
}

/// Like [`request`], surfacing I/O failures such as a reset connection.
pub fn try_request(address: SocketAddr, raw: &str) -> io::Result<Vec<u8>> {
    let mut stream = TcpStream::connect(address)?;
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    stream.write_all(raw.as_bytes())?;
    let mut reply = Vec::new();
    stream.read_to_end(&mut reply)?;
    Ok(reply)
}

/// Body of a serialised response, following the blank line.
#[must_use]
pub fn response_body(reply: &[u8]) -> &[u8] {
    reply
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map_or(&[] as &[u8], |index| &reply[index + 4..])
}
