//! Connected stream sockets.
//!
//! # Responsibilities
//! - Queue writes and complete them in issue order
//! - Run one streaming read per socket through a [`Decoder`]
//! - Close cooperatively on cancel
//!
//! Each socket owns a writer task fed by an unbounded command channel; the
//! read half is handed to the streaming read task when one starts.

use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use super::bridge::Shared;
use super::cancel::{race, CancelToken, Outcome};
use super::connection::{HandleGuard, HandleId};
use super::decode::{DecodeError, Decoder};
use super::task::{PendingTask, ReadResult, Schedulee, WriteResult};
use super::{ChannelError, Endpoint};
use crate::addr::Address;
use crate::observability::metrics;
use crate::protocol::{Family, Protocol, SocketType};

type Completion = Box<dyn FnOnce(WriteResult) + Send>;

enum WriterCommand {
    Write {
        data: Vec<u8>,
        schedulee: Schedulee,
        complete: Completion,
    },
    Shutdown,
}

/// A connected TCP socket driven by the bridge.
///
/// Cheap to clone; clones refer to the same socket.
#[derive(Clone)]
pub struct SocketHandle {
    inner: Arc<SocketInner>,
}

struct SocketInner {
    local: SocketAddr,
    peer: SocketAddr,
    reader: Mutex<Option<OwnedReadHalf>>,
    writer: mpsc::UnboundedSender<WriterCommand>,
    cancel: CancelToken,
    shared: Shared,
    guard: HandleGuard,
}

impl SocketHandle {
    /// Take ownership of a connected stream and start its writer task.
    pub(crate) fn from_stream(stream: TcpStream, shared: &Shared) -> std::io::Result<Self> {
        let local = stream.local_addr()?;
        let peer = stream.peer_addr()?;
        let (read_half, write_half) = stream.into_split();
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancelToken::new();
        let guard = shared.tracker.track();

        tracing::debug!(handle = %guard.id(), local = %local, peer = %peer, "Socket opened");

        shared
            .runtime
            .spawn(write_loop(write_half, rx, cancel.clone(), guard.id()));

        Ok(Self {
            inner: Arc::new(SocketInner {
                local,
                peer,
                reader: Mutex::new(Some(read_half)),
                writer: tx,
                cancel,
                shared: shared.clone(),
                guard,
            }),
        })
    }

    pub fn id(&self) -> HandleId {
        self.inner.guard.id()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.inner.peer
    }

    /// Queue `data` for writing.
    ///
    /// The payload goes to the OS in a single write call; the record reports
    /// how many bytes it took. Writes complete in the order they were issued.
    pub fn write<R>(&self, data: impl Into<Vec<u8>>, task: PendingTask<R>)
    where
        R: From<WriteResult> + Send + 'static,
    {
        let schedulee = task.schedulee();
        let command = WriterCommand::Write {
            data: data.into(),
            schedulee,
            complete: Box::new(move |record| task.emit(record)),
        };

        if let Err(mpsc::error::SendError(command)) = self.inner.writer.send(command) {
            if self.inner.cancel.is_cancelled() {
                return;
            }
            if let WriterCommand::Write { complete, .. } = command {
                metrics::record_completion("write", metrics::ERROR);
                complete(WriteResult {
                    schedulee,
                    error: Some(ChannelError::Closed.to_string()),
                    bytes_written: 0,
                });
            }
        }
    }

    /// Half-close the socket once every queued write has completed.
    pub fn shutdown_write(&self) -> Result<(), ChannelError> {
        self.inner
            .writer
            .send(WriterCommand::Shutdown)
            .map_err(|_| ChannelError::Closed)
    }

    /// Start the streaming read.
    ///
    /// Records flow until end of stream, an error or cancellation. Only one
    /// streaming read may run per socket.
    pub fn read<D, R>(&self, task: PendingTask<R>, decoder: D) -> Result<(), ChannelError>
    where
        D: Decoder,
        R: From<ReadResult<D::Output>> + Send + 'static,
    {
        if self.inner.cancel.is_cancelled() {
            return Err(ChannelError::Closed);
        }
        let reader = self
            .inner
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(ChannelError::AlreadyReading)?;

        self.inner.shared.runtime.spawn(read_loop(
            reader,
            task,
            decoder,
            self.inner.shared.read_buffer_size,
            self.inner.cancel.clone(),
            self.id(),
        ));
        Ok(())
    }

    /// Close the socket. Outstanding operations end without records.
    pub fn cancel(&self) {
        tracing::debug!(handle = %self.id(), "Socket cancelled");
        self.inner.cancel.cancel();
        self.inner
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn close(&self) {
        self.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }
}

impl Endpoint for SocketHandle {
    fn local_address(&self) -> Result<Address, ChannelError> {
        Ok(Address::from(self.inner.local))
    }

    fn peer_address(&self) -> Result<Address, ChannelError> {
        Ok(Address::from(self.inner.peer))
    }

    fn triple(&self) -> (Family, SocketType, Protocol) {
        (Family::of(&self.inner.local), SocketType::Stream, Protocol::Tcp)
    }
}

impl fmt::Debug for SocketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketHandle")
            .field("id", &self.id())
            .field("local", &self.inner.local)
            .field("peer", &self.inner.peer)
            .finish()
    }
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut commands: mpsc::UnboundedReceiver<WriterCommand>,
    cancel: CancelToken,
    id: HandleId,
) {
    loop {
        let command = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            command = commands.recv() => match command {
                Some(command) => command,
                None => break,
            },
        };

        match command {
            WriterCommand::Write {
                data,
                schedulee,
                complete,
            } => match race(&cancel, writer.write(&data)).await {
                Outcome::Succeeded(n) => {
                    tracing::trace!(handle = %id, schedulee = %schedulee, bytes = n, "Write completed");
                    metrics::record_completion("write", metrics::OK);
                    metrics::record_bytes("written", n);
                    complete(WriteResult {
                        schedulee,
                        error: None,
                        bytes_written: n,
                    });
                }
                Outcome::Failed(e) => {
                    tracing::debug!(handle = %id, schedulee = %schedulee, error = %e, "Write failed");
                    metrics::record_completion("write", metrics::ERROR);
                    complete(WriteResult {
                        schedulee,
                        error: Some(e.to_string()),
                        bytes_written: 0,
                    });
                }
                Outcome::Cancelled => break,
            },
            WriterCommand::Shutdown => {
                if let Outcome::Failed(e) = race(&cancel, writer.shutdown()).await {
                    tracing::debug!(handle = %id, error = %e, "Write shutdown failed");
                }
            }
        }
    }
    tracing::trace!(handle = %id, "Writer stopped");
}

async fn read_loop<D, R>(
    mut reader: OwnedReadHalf,
    mut task: PendingTask<R>,
    mut decoder: D,
    buffer_size: usize,
    cancel: CancelToken,
    id: HandleId,
) where
    D: Decoder,
    R: From<ReadResult<D::Output>>,
{
    let schedulee = task.schedulee();
    let fail = |task: &PendingTask<R>, error: String| {
        tracing::debug!(handle = %id, schedulee = %schedulee, error = %error, "Read failed");
        metrics::record_completion("read", metrics::ERROR);
        task.emit(ReadResult {
            schedulee,
            error: Some(error),
            payload: None,
            sequence: None,
        });
    };

    let mut buffer = vec![0u8; buffer_size];
    let mut filled = 0;

    loop {
        let n = match race(&cancel, reader.read(&mut buffer[filled..])).await {
            Outcome::Succeeded(n) => n,
            Outcome::Failed(e) => return fail(&task, e.to_string()),
            Outcome::Cancelled => return,
        };

        if n == 0 {
            if filled > 0 {
                return fail(&task, DecodeError::Trailing { buffered: filled }.to_string());
            }
            tracing::debug!(handle = %id, schedulee = %schedulee, sequence = task.sequence(), "End of stream");
            metrics::record_completion("read", metrics::OK);
            task.emit(ReadResult {
                schedulee,
                error: None,
                payload: None,
                sequence: Some(task.sequence()),
            });
            return;
        }

        metrics::record_bytes("read", n);
        filled += n;

        let (payload, consumed) = match decoder.decode(&buffer[..filled]) {
            Ok((payload, consumed)) => (payload, consumed.min(filled)),
            Err(e) => return fail(&task, e.to_string()),
        };

        if consumed == 0 {
            if filled == buffer.len() {
                return fail(&task, DecodeError::BufferFull { buffered: filled }.to_string());
            }
            continue;
        }

        let sequence = task.next_sequence();
        tracing::trace!(handle = %id, schedulee = %schedulee, sequence, bytes = consumed, "Read chunk");
        metrics::record_completion("read", metrics::OK);
        task.emit(ReadResult {
            schedulee,
            error: None,
            payload: Some(payload),
            sequence: Some(sequence),
        });

        buffer.copy_within(consumed..filled, 0);
        filled -= consumed;
    }
}
