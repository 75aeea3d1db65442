//! Completion-driven socket I/O subsystem.
//!
//! # Data Flow
//! ```text
//! Scheduler thread
//!     → bridge.rs (IoBridge::listen / connect / connect_host)
//!     → listener.rs (accept loop) / socket.rs (writer task, streaming read)
//!     → decode.rs (bytes → payload, leftover kept in the read buffer)
//!     → task.rs (record pushed onto the task's ResultQueue)
//!     → Scheduler pops the record and resumes the schedulee
//!
//! Handle lifetime:
//!     Open → (reads, writes, accepts in flight) → Cancelled → Dropped
//! ```
//!
//! # Design Decisions
//! - Issuing an operation never blocks; completions run on runtime workers
//! - Record shapes are fixed per operation: (schedulee, error, payload..., sequence?)
//! - Cancellation is an outcome, not an error, and produces no record
//! - Each handle is tracked for accounting and graceful shutdown

pub mod bridge;
pub mod cancel;
pub mod connection;
pub mod decode;
pub mod endpoint;
pub mod error;
pub mod listener;
pub mod socket;
pub mod task;

pub use bridge::{IoBridge, UNRESOLVED_HOST};
pub use cancel::{race, CancelToken, Outcome};
pub use connection::{HandleId, HandleTracker};
pub use decode::{BytesDecoder, DecodeError, Decoder, Utf8Decoder};
pub use endpoint::Endpoint;
pub use error::ChannelError;
pub use listener::ListenerHandle;
pub use socket::SocketHandle;
pub use task::{
    AcceptResult, ConnectResult, PendingTask, ReadResult, ResultQueue, Schedulee, WriteResult,
};
