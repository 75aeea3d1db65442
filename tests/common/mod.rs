//! Shared utilities for bridge integration tests.
//!
//! Peers are plain blocking std sockets on their own threads; the test thread
//! plays the scheduler and consumes result queues.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread::JoinHandle;
use std::time::Duration;

use netbridge::config::IoConfig;
use netbridge::net::{IoBridge, ResultQueue};
use netbridge::Address;

/// How long to wait for a record that must arrive.
pub const WAIT: Duration = Duration::from_secs(5);

/// How long a queue must stay empty to count as silent.
pub const QUIET: Duration = Duration::from_millis(300);

pub fn bridge() -> IoBridge {
    bridge_with_buffer(IoConfig::default().read_buffer_size)
}

pub fn bridge_with_buffer(read_buffer_size: usize) -> IoBridge {
    IoBridge::start(&IoConfig {
        worker_threads: 2,
        read_buffer_size,
        ..IoConfig::default()
    })
    .unwrap()
}

pub fn loopback(port: u16) -> Address {
    Address::from_presentation("127.0.0.1", port).unwrap()
}

/// Pop one record or fail the test.
pub fn next<T>(queue: &ResultQueue<T>) -> T {
    queue.pop_timeout(WAIT).expect("no record arrived in time")
}

/// Pop records until the queue stays quiet.
pub fn drain<T>(queue: &ResultQueue<T>) -> Vec<T> {
    std::iter::from_fn(|| queue.pop_timeout(QUIET)).collect()
}

/// Run `serve` against the first client of a fresh loopback listener.
pub fn peer<F>(serve: F) -> (SocketAddr, JoinHandle<()>)
where
    F: FnOnce(TcpStream) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        serve(stream);
    });
    (addr, handle)
}

/// Send `chunks` with a pause between each, then close.
pub fn send_chunks(mut stream: TcpStream, chunks: &[&[u8]]) {
    for chunk in chunks {
        stream.write_all(chunk).unwrap();
        stream.flush().unwrap();
        std::thread::sleep(Duration::from_millis(30));
    }
}

/// Read until the other side closes.
pub fn read_to_end(mut stream: TcpStream) -> Vec<u8> {
    let mut out = Vec::new();
    stream.read_to_end(&mut out).unwrap();
    out
}

/// A port nothing is listening on.
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Close with SO_LINGER(0) so the other side sees a connection reset.
#[cfg(unix)]
pub fn reset(stream: TcpStream) {
    use std::os::unix::io::AsRawFd;

    let linger = libc::linger {
        l_onoff: 1,
        l_linger: 0,
    };
    let rc = unsafe {
        libc::setsockopt(
            stream.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_LINGER,
            &linger as *const libc::linger as *const libc::c_void,
            std::mem::size_of::<libc::linger>() as libc::socklen_t,
        )
    };
    assert_eq!(rc, 0, "setsockopt(SO_LINGER) failed");
    drop(stream);
}
