//! Pending tasks, result queues and the records they carry.
//!
//! # Responsibilities
//! - Name the scheduler's continuation with an opaque [`Schedulee`]
//! - Deliver completion records to a multi-producer, multi-consumer queue
//! - Number streaming read records
//!
//! Every record starts with the schedulee and the error slot, followed by the
//! operation's payload fields. The shapes never vary per outcome; absent
//! values are `None`.

use std::fmt;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use super::{ListenerHandle, SocketHandle};

/// Opaque token naming the scheduler task to resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Schedulee(u64);

impl Schedulee {
    pub fn new(token: u64) -> Self {
        Self(token)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Schedulee {
    fn from(token: u64) -> Self {
        Self(token)
    }
}

impl fmt::Display for Schedulee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sched-{}", self.0)
    }
}

/// Unbounded concurrent queue of completion records.
///
/// Cloning yields another handle onto the same queue. Producers are bridge
/// worker threads; consumers may block, poll or wait with a timeout.
pub struct ResultQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> ResultQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    pub fn push(&self, record: T) {
        // Cannot fail: this handle keeps the receiving side alive.
        let _ = self.tx.send(record);
    }

    /// Block until a record arrives.
    pub fn pop(&self) -> Option<T> {
        self.rx.recv().ok()
    }

    pub fn try_pop(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for a record.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(record) => Some(record),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl<T> Clone for ResultQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
        }
    }
}

impl<T> Default for ResultQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ResultQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultQueue").field("len", &self.len()).finish()
    }
}

/// One outstanding operation.
///
/// `R` is the queue's record type; every record an operation produces is
/// converted into it, so one queue can serve several operation kinds.
#[derive(Debug)]
pub struct PendingTask<R> {
    schedulee: Schedulee,
    queue: ResultQueue<R>,
    sequence: u64,
}

impl<R> PendingTask<R> {
    pub fn new(schedulee: impl Into<Schedulee>, queue: &ResultQueue<R>) -> Self {
        Self {
            schedulee: schedulee.into(),
            queue: queue.clone(),
            sequence: 0,
        }
    }

    pub fn schedulee(&self) -> Schedulee {
        self.schedulee
    }

    pub fn queue(&self) -> &ResultQueue<R> {
        &self.queue
    }

    /// Current sequence number, advancing the counter.
    pub fn next_sequence(&mut self) -> u64 {
        let current = self.sequence;
        self.sequence += 1;
        current
    }

    /// Sequence number the next record will carry.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn emit(&self, record: impl Into<R>) {
        self.queue.push(record.into());
    }
}

/// Completion of a connect.
#[derive(Debug)]
pub struct ConnectResult {
    pub schedulee: Schedulee,
    pub error: Option<String>,
    pub connection: Option<SocketHandle>,
}

/// One event of an accept loop.
///
/// The first record carries the listener; every later one carries either a
/// connection or an error.
#[derive(Debug)]
pub struct AcceptResult {
    pub schedulee: Schedulee,
    pub error: Option<String>,
    pub listener: Option<ListenerHandle>,
    pub connection: Option<SocketHandle>,
}

/// Completion of a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
    pub schedulee: Schedulee,
    pub error: Option<String>,
    pub bytes_written: usize,
}

/// One event of a streaming read.
///
/// Data records carry a payload and a sequence number. The end-of-stream
/// record has a sequence number but no payload. Error records have neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResult<T> {
    pub schedulee: Schedulee,
    pub error: Option<String>,
    pub payload: Option<T>,
    pub sequence: Option<u64>,
}

impl<T> ReadResult<T> {
    pub fn is_end_of_stream(&self) -> bool {
        self.error.is_none() && self.payload.is_none()
    }
}
