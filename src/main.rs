//! netbridge echo daemon.
//!
//! Drives every socket through the I/O bridge from a single scheduler thread
//! that consumes completion records and echoes received bytes back.
//!
//! ```text
//!   client ──▶ ListenerHandle::accept ──▶ AcceptResult ─┐
//!                                                        │
//!   client ──▶ SocketHandle::read ──────▶ ReadResult ───┼──▶ ResultQueue ──▶ scheduler loop
//!                                                        │                       │
//!   client ◀── SocketHandle::write ─────▶ WriteResult ──┘          write back ◀─┘
//! ```

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use netbridge::config::loader::load_config;
use netbridge::lifecycle::{shutdown_signal, Shutdown};
use netbridge::net::{
    AcceptResult, BytesDecoder, Endpoint, PendingTask, ReadResult, ResultQueue, SocketHandle,
    WriteResult,
};
use netbridge::observability::{logging, metrics};
use netbridge::protocol::{Protocol, SocketType};
use netbridge::resolve::ResolveFlags;
use netbridge::{BridgeConfig, Hints, IoBridge, Resolver};

const ACCEPT: u64 = 0;
const POLL_INTERVAL: Duration = Duration::from_millis(200);
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "netbridge")]
#[command(about = "Echo daemon built on the netbridge I/O bridge", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Every record kind the scheduler consumes.
#[derive(Debug)]
enum Event {
    Accept(AcceptResult),
    Read(ReadResult<Vec<u8>>),
    Write(WriteResult),
}

impl From<AcceptResult> for Event {
    fn from(r: AcceptResult) -> Self {
        Event::Accept(r)
    }
}

impl From<ReadResult<Vec<u8>>> for Event {
    fn from(r: ReadResult<Vec<u8>>) -> Self {
        Event::Read(r)
    }
}

impl From<WriteResult> for Event {
    fn from(r: WriteResult) -> Self {
        Event::Write(r)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => BridgeConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!("netbridge v{} starting", env!("CARGO_PKG_VERSION"));

    let bridge = IoBridge::start(&config.io)?;

    if config.observability.metrics_enabled {
        let _enter = bridge.handle().enter();
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let resolver = Resolver::new(&config.resolver);
    let hints = Hints::default()
        .socket_type(SocketType::Stream)
        .protocol(Protocol::Tcp)
        .flags(ResolveFlags::PASSIVE | ResolveFlags::ADDRCONFIG);
    let bind = resolver
        .resolve(config.server.bind_host.as_deref(), config.server.port, &hints)?
        .into_iter()
        .next()
        .ok_or("bind host resolved to no usable address")?;

    let listener = bridge.listen(&bind.address, config.io.listen_backlog)?;
    tracing::info!(address = %listener.local_address()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let mut stop = shutdown.subscribe();
    bridge.handle().spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    let queue: ResultQueue<Event> = ResultQueue::new();
    listener.accept(PendingTask::new(ACCEPT, &queue));

    let mut connections = Scheduler::default();
    while !stop.is_triggered() {
        if let Some(event) = queue.pop_timeout(POLL_INTERVAL) {
            connections.handle(event, &queue);
        }
    }

    tracing::info!(connections = connections.len(), "Shutting down");
    listener.cancel();
    drop(listener);
    connections.close_all();
    while queue.try_pop().is_some() {}

    let drained = bridge
        .handle()
        .block_on(async { tokio::time::timeout(DRAIN_TIMEOUT, bridge.wait_idle()).await });
    if drained.is_err() {
        tracing::warn!(active = bridge.active_handles(), "Drain deadline exceeded");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Bytes waiting to be echoed on one connection.
///
/// At most one write is outstanding. A short write puts its unwritten tail
/// back at the front so the next write resumes where the last one stopped.
#[derive(Debug, Default)]
struct Outbox {
    in_flight: Option<Vec<u8>>,
    backlog: VecDeque<Vec<u8>>,
    finished: bool,
}

impl Outbox {
    /// Queue `data`; returns the bytes to write now if the socket is idle.
    fn push(&mut self, data: Vec<u8>) -> Option<Vec<u8>> {
        if !data.is_empty() {
            self.backlog.push_back(data);
        }
        self.next()
    }

    /// Account for a completed write; returns what to write next.
    fn complete(&mut self, written: usize) -> Option<Vec<u8>> {
        if let Some(sent) = self.in_flight.take() {
            if written < sent.len() {
                self.backlog.push_front(sent[written..].to_vec());
            }
        }
        self.next()
    }

    fn next(&mut self) -> Option<Vec<u8>> {
        if self.in_flight.is_some() {
            return None;
        }
        let data = self.backlog.pop_front()?;
        self.in_flight = Some(data.clone());
        Some(data)
    }

    fn is_drained(&self) -> bool {
        self.in_flight.is_none() && self.backlog.is_empty()
    }
}

struct Echo {
    socket: SocketHandle,
    outbox: Outbox,
}

/// Per-connection state of the echo loop.
#[derive(Default)]
struct Scheduler {
    next: u64,
    open: HashMap<u64, Echo>,
}

impl Scheduler {
    fn len(&self) -> usize {
        self.open.len()
    }

    fn handle(&mut self, event: Event, queue: &ResultQueue<Event>) {
        match event {
            Event::Accept(AcceptResult {
                connection: Some(connection),
                ..
            }) => {
                self.next += 1;
                let token = self.next;
                tracing::info!(handle = %connection.id(), peer = %connection.peer_addr(), "Client connected");
                match connection.read(PendingTask::new(token, queue), BytesDecoder) {
                    Ok(()) => {
                        let echo = Echo {
                            socket: connection,
                            outbox: Outbox::default(),
                        };
                        self.open.insert(token, echo);
                    }
                    Err(e) => tracing::warn!(handle = %connection.id(), error = %e, "Read not started"),
                }
            }
            Event::Accept(AcceptResult {
                error: Some(error), ..
            }) => {
                tracing::error!(error = %error, "Accept loop ended");
            }
            Event::Accept(_) => {}
            Event::Read(record) => self.on_read(record, queue),
            Event::Write(record) => self.on_write(record, queue),
        }
    }

    fn on_read(&mut self, record: ReadResult<Vec<u8>>, queue: &ResultQueue<Event>) {
        let token = record.schedulee.as_u64();
        let Some(echo) = self.open.get_mut(&token) else {
            return;
        };

        match record {
            ReadResult {
                error: Some(error), ..
            } => {
                tracing::debug!(handle = %echo.socket.id(), error = %error, "Read failed");
                self.drop_connection(token);
            }
            ReadResult {
                payload: Some(payload),
                ..
            } => {
                if let Some(data) = echo.outbox.push(payload) {
                    echo.socket.write(data, PendingTask::new(token, queue));
                }
            }
            _ => {
                tracing::info!(handle = %echo.socket.id(), "Client disconnected");
                echo.outbox.finished = true;
                self.finish_if_drained(token);
            }
        }
    }

    fn on_write(&mut self, record: WriteResult, queue: &ResultQueue<Event>) {
        let token = record.schedulee.as_u64();
        let Some(echo) = self.open.get_mut(&token) else {
            return;
        };

        if let Some(error) = record.error {
            tracing::warn!(handle = %echo.socket.id(), error = %error, "Echo write failed");
            self.drop_connection(token);
            return;
        }

        if let Some(data) = echo.outbox.complete(record.bytes_written) {
            tracing::trace!(handle = %echo.socket.id(), bytes = data.len(), "Continuing echo");
            echo.socket.write(data, PendingTask::new(token, queue));
        }
        self.finish_if_drained(token);
    }

    /// Half-close a connection whose client is done once its echo is flushed.
    fn finish_if_drained(&mut self, token: u64) {
        let done = self
            .open
            .get(&token)
            .is_some_and(|echo| echo.outbox.finished && echo.outbox.is_drained());
        if !done {
            return;
        }
        if let Some(echo) = self.open.remove(&token) {
            if let Err(e) = echo.socket.shutdown_write() {
                tracing::warn!(handle = %echo.socket.id(), error = %e, "Half-close failed");
            }
        }
    }

    fn drop_connection(&mut self, token: u64) {
        if let Some(echo) = self.open.remove(&token) {
            echo.socket.cancel();
        }
    }

    fn close_all(&mut self) {
        for (_, echo) in self.open.drain() {
            echo.socket.cancel();
        }
    }
}
