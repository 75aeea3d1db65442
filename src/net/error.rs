//! Setup failures raised synchronously to the caller.
//!
//! Failures of in-flight operations never surface here; they travel in the
//! `error` slot of result records.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::validation::ValidationError;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to listen on {address}: {source}")]
    Listen {
        address: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("a streaming read is already active on this socket")]
    AlreadyReading,

    #[error("socket is closed")]
    Closed,

    #[error("listening sockets have no peer address")]
    NoPeer,

    #[error("invalid I/O configuration: {}", join(.0))]
    InvalidConfig(Vec<ValidationError>),

    #[error("failed to start I/O runtime: {0}")]
    Runtime(#[source] io::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
