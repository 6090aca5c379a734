//! Blocking Unix domain socket client that speaks FastCGI to a single
//! local worker. One connection per request: connect, write the whole
//! request, read until the peer closes its end (this bridge never sets
//! `FCGI_KEEP_CONN`), then decode.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::error::{BridgeError, BridgeErrorKind};
use crate::fastcgi::{self, FastCgiRequest, FastCgiResponse};
use crate::interrupter::DeadlineInterrupter;
use crate::logging;

const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(10);
const READ_CHUNK_SIZE: usize = 16 * 1024;

/// Connects to `path`, retrying on the usual "not listening yet" errors
/// until `timeout` elapses. A FastCGI listen socket accepts a connection
/// as soon as the worker calls `listen()`, well before it is ready to
/// answer a request — readiness is a [`crate::supervisor`] concern, not
/// this one.
pub fn connect(path: &Path, timeout: Duration) -> Result<UnixStream, BridgeError> {
    let deadline = Instant::now() + timeout;
    let mut last_error = None;

    loop {
        match UnixStream::connect(path) {
            Ok(stream) => return Ok(stream),
            Err(err) => last_error = Some(err),
        }
        if Instant::now() >= deadline {
            break;
        }
        std::thread::sleep(CONNECT_RETRY_INTERVAL);
    }

    Err(BridgeError::from_io(
        BridgeErrorKind::TransportConnectFailed,
        last_error.unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out")),
    ))
}

/// Sends one FastCGI request over a fresh connection to `path` and
/// returns the decoded response. If `interrupter` is armed and fires
/// mid-read, the socket is shut down underfoot and this returns
/// [`BridgeErrorKind::DeadlineReached`] instead of a raw I/O error.
pub fn send_request(
    path: &Path,
    request: &FastCgiRequest,
    connect_timeout: Duration,
    read_timeout: Duration,
    interrupter: Option<&DeadlineInterrupter>,
) -> Result<FastCgiResponse, BridgeError> {
    let mut stream = connect(path, connect_timeout)?;
    stream
        .set_read_timeout(Some(read_timeout))
        .map_err(|err| BridgeError::from_io(BridgeErrorKind::TransportConnectFailed, err))?;

    let encoded = fastcgi::encode_request(request);
    stream
        .write_all(&encoded)
        .map_err(|err| BridgeError::from_io(BridgeErrorKind::TransportReadFailed, err))?;

    if let Some(interrupter) = interrupter {
        match stream.try_clone() {
            Ok(clone) => interrupter.register_stream(clone),
            Err(err) => logging::warn(format!("could not register transport socket with deadline interrupter: {err}")),
        }
    }

    let read_result = read_until_closed(&mut stream);

    if let Some(interrupter) = interrupter {
        interrupter.clear_stream();
        if interrupter.has_fired() {
            return Err(BridgeError::new_with_kind_only(BridgeErrorKind::DeadlineReached));
        }
    }

    let bytes = read_result?;
    fastcgi::decode_response(&bytes)
}

fn read_until_closed(stream: &mut UnixStream) -> Result<Vec<u8>, BridgeError> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => return Ok(buffer),
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
            Err(err) if matches!(err.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {
                return Err(BridgeError::from_io(BridgeErrorKind::TransportTimeout, err));
            }
            Err(err) => return Err(BridgeError::from_io(BridgeErrorKind::TransportReadFailed, err)),
        }
    }
}
