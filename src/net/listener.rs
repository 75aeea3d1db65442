//! Listening sockets and the accept loop.
//!
//! # Responsibilities
//! - Accept incoming TCP connections until cancelled
//! - Wrap each client in a [`SocketHandle`]
//! - Report the first non-cancellation failure and stop

use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::net::TcpListener;

use super::bridge::Shared;
use super::cancel::{race, CancelToken, Outcome};
use super::connection::{HandleGuard, HandleId};
use super::task::{AcceptResult, PendingTask};
use super::{ChannelError, Endpoint, SocketHandle};
use crate::addr::Address;
use crate::observability::metrics;
use crate::protocol::{Family, Protocol, SocketType};

/// A bound, listening TCP socket.
///
/// Cheap to clone; clones refer to the same listener.
#[derive(Clone)]
pub struct ListenerHandle {
    inner: Arc<ListenerInner>,
}

struct ListenerInner {
    local: SocketAddr,
    listener: Mutex<Option<Arc<TcpListener>>>,
    cancel: CancelToken,
    shared: Shared,
    guard: HandleGuard,
}

impl ListenerHandle {
    pub(crate) fn new(listener: TcpListener, shared: &Shared) -> std::io::Result<Self> {
        let local = listener.local_addr()?;
        let guard = shared.tracker.track();

        tracing::info!(handle = %guard.id(), address = %local, "Listener bound");

        Ok(Self {
            inner: Arc::new(ListenerInner {
                local,
                listener: Mutex::new(Some(Arc::new(listener))),
                cancel: CancelToken::new(),
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

    /// Start accepting clients.
    ///
    /// A record carrying this listener is pushed before returning. After that
    /// every client produces one connection record. Cancellation ends the
    /// loop silently; any other failure ends it with one error record.
    pub fn accept<R>(&self, task: PendingTask<R>)
    where
        R: From<AcceptResult> + Send + 'static,
    {
        let schedulee = task.schedulee();
        task.emit(AcceptResult {
            schedulee,
            error: None,
            listener: Some(self.clone()),
            connection: None,
        });

        let Some(listener) = self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        else {
            return;
        };

        let cancel = self.inner.cancel.clone();
        let shared = self.inner.shared.clone();
        let id = self.id();

        self.inner.shared.runtime.spawn(async move {
            loop {
                let outcome = match race(&cancel, listener.accept()).await {
                    Outcome::Succeeded((stream, peer)) => {
                        tracing::debug!(handle = %id, peer = %peer, "Connection accepted");
                        Outcome::from(SocketHandle::from_stream(stream, &shared))
                    }
                    Outcome::Failed(e) => Outcome::Failed(e),
                    Outcome::Cancelled => Outcome::Cancelled,
                };

                match outcome {
                    Outcome::Succeeded(connection) => {
                        metrics::record_completion("accept", metrics::OK);
                        task.emit(AcceptResult {
                            schedulee,
                            error: None,
                            listener: None,
                            connection: Some(connection),
                        });
                    }
                    Outcome::Failed(e) => {
                        tracing::warn!(handle = %id, error = %e, "Accept failed");
                        metrics::record_completion("accept", metrics::ERROR);
                        task.emit(AcceptResult {
                            schedulee,
                            error: Some(e.to_string()),
                            listener: None,
                            connection: None,
                        });
                        break;
                    }
                    Outcome::Cancelled => break,
                }
            }
            tracing::debug!(handle = %id, "Accept loop stopped");
        });
    }

    /// Stop accepting and close the socket.
    pub fn cancel(&self) {
        tracing::debug!(handle = %self.id(), "Listener cancelled");
        self.inner.cancel.cancel();
        self.inner
            .listener
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

impl Endpoint for ListenerHandle {
    fn local_address(&self) -> Result<Address, ChannelError> {
        Ok(Address::from(self.inner.local))
    }

    fn peer_address(&self) -> Result<Address, ChannelError> {
        Err(ChannelError::NoPeer)
    }

    fn triple(&self) -> (Family, SocketType, Protocol) {
        (Family::of(&self.inner.local), SocketType::Stream, Protocol::Tcp)
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("id", &self.id())
            .field("local", &self.inner.local)
            .finish()
    }
}
