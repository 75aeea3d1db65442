//! The bridge between a synchronous scheduler and the tokio reactor.
//!
//! # Responsibilities
//! - Own (or borrow) the runtime whose workers complete operations
//! - Open listeners and outbound connections
//! - Report how many handles are alive

use std::io;
use std::net::SocketAddr;

use tokio::net::{TcpSocket, TcpStream};
use tokio::runtime::{Builder, Handle, Runtime};

use super::cancel::{race, CancelToken, Outcome};
use super::connection::HandleTracker;
use super::task::{ConnectResult, PendingTask};
use super::{ChannelError, ListenerHandle, SocketHandle};
use crate::addr::Address;
use crate::config::validation::validate_io;
use crate::config::IoConfig;
use crate::observability::metrics;

/// Message reported when a hostname yields no address.
pub const UNRESOLVED_HOST: &str = "failed to resolve host name";

/// State every handle of one bridge shares.
#[derive(Debug, Clone)]
pub(crate) struct Shared {
    pub(crate) runtime: Handle,
    pub(crate) tracker: HandleTracker,
    pub(crate) read_buffer_size: usize,
}

/// Entry point for asynchronous socket operations.
///
/// Every operation returns immediately; completions run on runtime workers
/// and push records onto the task's queue.
pub struct IoBridge {
    runtime: Option<Runtime>,
    shared: Shared,
}

impl IoBridge {
    /// Start a dedicated multi-threaded runtime sized by `config`.
    pub fn start(config: &IoConfig) -> Result<Self, ChannelError> {
        validate_io(config).map_err(ChannelError::InvalidConfig)?;
        let runtime = Builder::new_multi_thread()
            .worker_threads(config.worker_threads)
            .thread_name(config.thread_name.clone())
            .enable_all()
            .build()
            .map_err(ChannelError::Runtime)?;

        tracing::info!(
            worker_threads = config.worker_threads,
            read_buffer_size = config.read_buffer_size,
            "I/O bridge started"
        );

        let handle = runtime.handle().clone();
        Ok(Self {
            runtime: Some(runtime),
            shared: Shared {
                runtime: handle,
                tracker: HandleTracker::new(),
                read_buffer_size: config.read_buffer_size,
            },
        })
    }

    /// Run on an existing runtime.
    pub fn with_handle(handle: Handle, config: &IoConfig) -> Result<Self, ChannelError> {
        validate_io(config).map_err(ChannelError::InvalidConfig)?;
        Ok(Self {
            runtime: None,
            shared: Shared {
                runtime: handle,
                tracker: HandleTracker::new(),
                read_buffer_size: config.read_buffer_size,
            },
        })
    }

    /// Run on the runtime the caller is executing in.
    pub fn current(config: &IoConfig) -> Result<Self, ChannelError> {
        let handle = Handle::try_current().map_err(|e| ChannelError::Runtime(io::Error::other(e)))?;
        Self::with_handle(handle, config)
    }

    pub fn handle(&self) -> &Handle {
        &self.shared.runtime
    }

    /// Number of live socket and listener handles.
    pub fn active_handles(&self) -> u64 {
        self.shared.tracker.active_count()
    }

    /// Resolves once every handle has been dropped.
    pub async fn wait_idle(&self) {
        self.shared.tracker.wait_idle().await
    }

    /// Bind and listen on `address`.
    ///
    /// Both steps run synchronously; their failures are returned here rather
    /// than through a queue.
    pub fn listen(&self, address: &Address, backlog: u32) -> Result<ListenerHandle, ChannelError> {
        let addr = address.to_socket_addr();
        if backlog == 0 {
            return Err(ChannelError::Listen {
                address: addr,
                source: io::Error::new(io::ErrorKind::InvalidInput, "backlog must be positive"),
            });
        }
        let _enter = self.shared.runtime.enter();

        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4(),
            SocketAddr::V6(_) => TcpSocket::new_v6(),
        }?;
        #[cfg(unix)]
        socket.set_reuseaddr(true)?;
        socket
            .bind(addr)
            .map_err(|source| ChannelError::Bind { address: addr, source })?;
        let listener = socket
            .listen(backlog)
            .map_err(|source| ChannelError::Listen { address: addr, source })?;

        ListenerHandle::new(listener, &self.shared).map_err(ChannelError::Io)
    }

    /// Connect to `address`.
    ///
    /// Exactly one record follows unless the returned token is cancelled first.
    pub fn connect<R>(&self, address: &Address, task: PendingTask<R>) -> CancelToken
    where
        R: From<ConnectResult> + Send + 'static,
    {
        let addr = address.to_socket_addr();
        self.spawn_connect(task, async move { Ok(vec![addr]) })
    }

    /// Look up `host` and connect to the first address that answers.
    pub fn connect_host<R>(&self, host: &str, port: u16, task: PendingTask<R>) -> CancelToken
    where
        R: From<ConnectResult> + Send + 'static,
    {
        let host = host.to_string();
        self.spawn_connect(task, async move {
            match tokio::net::lookup_host((host.as_str(), port)).await {
                Ok(found) => {
                    let found: Vec<SocketAddr> = found.collect();
                    if found.is_empty() {
                        Err(UNRESOLVED_HOST.to_string())
                    } else {
                        Ok(found)
                    }
                }
                Err(e) => {
                    tracing::debug!(host = %host, error = %e, "Lookup failed");
                    Err(UNRESOLVED_HOST.to_string())
                }
            }
        })
    }

    fn spawn_connect<R, F>(&self, task: PendingTask<R>, targets: F) -> CancelToken
    where
        R: From<ConnectResult> + Send + 'static,
        F: std::future::Future<Output = Result<Vec<SocketAddr>, String>> + Send + 'static,
    {
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let shared = self.shared.clone();

        self.shared.runtime.spawn(async move {
            let schedulee = task.schedulee();
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                targets = targets => match targets {
                    Ok(targets) => connect_any(&cancel, &targets).await,
                    Err(message) => Outcome::Failed(io::Error::other(message)),
                },
            };

            let record = match result {
                Outcome::Cancelled => return,
                Outcome::Succeeded(stream) => match SocketHandle::from_stream(stream, &shared) {
                    Ok(connection) => ConnectResult {
                        schedulee,
                        error: None,
                        connection: Some(connection),
                    },
                    Err(e) => failed(schedulee, e),
                },
                Outcome::Failed(e) => failed(schedulee, e),
            };

            let outcome = if record.error.is_none() { metrics::OK } else { metrics::ERROR };
            metrics::record_completion("connect", outcome);
            task.emit(record);
        });

        token
    }
}

impl Drop for IoBridge {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for IoBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoBridge")
            .field("owns_runtime", &self.runtime.is_some())
            .field("active_handles", &self.active_handles())
            .finish()
    }
}

async fn connect_any(cancel: &CancelToken, targets: &[SocketAddr]) -> Outcome<TcpStream> {
    let mut last = Outcome::Failed(io::Error::other(UNRESOLVED_HOST));
    for addr in targets {
        last = race(cancel, TcpStream::connect(*addr)).await;
        match &last {
            Outcome::Failed(e) => tracing::debug!(peer = %addr, error = %e, "Connect attempt failed"),
            _ => break,
        }
    }
    last
}

fn failed(schedulee: super::Schedulee, error: io::Error) -> ConnectResult {
    ConnectResult {
        schedulee,
        error: Some(error.to_string()),
        connection: None,
    }
}
