//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (worker counts, buffer sizes, backlog)
//! - Validate addresses and log levels
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BridgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{BridgeConfig, IoConfig};

/// Smallest read buffer that still holds a full UTF-8 sequence with room to spare.
pub const MIN_READ_BUFFER: usize = 64;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check every semantic rule, collecting all failures.
pub fn validate_config(config: &BridgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = io_errors(&config.io);
    let mut fail = |field: &'static str, message: String| {
        errors.push(ValidationError { field, message });
    };

    if config.server.bind_host.as_deref() == Some("") {
        fail("server.bind_host", "must not be empty; omit it to bind every family".into());
    }
    if !LOG_LEVELS.contains(&config.observability.log_level.to_ascii_lowercase().as_str()) {
        fail(
            "observability.log_level",
            format!("unknown level {:?}", config.observability.log_level),
        );
    }
    if config.observability.metrics_address.parse::<SocketAddr>().is_err() {
        fail(
            "observability.metrics_address",
            format!("{:?} is not a socket address", config.observability.metrics_address),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check the rules the I/O bridge depends on.
///
/// A read buffer below [`MIN_READ_BUFFER`] would turn every read into a
/// zero-length one, indistinguishable from end of stream.
pub fn validate_io(io: &IoConfig) -> Result<(), Vec<ValidationError>> {
    let errors = io_errors(io);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn io_errors(io: &IoConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut fail = |field: &'static str, message: String| {
        errors.push(ValidationError { field, message });
    };

    if io.worker_threads == 0 {
        fail("io.worker_threads", "must be at least 1".into());
    }
    if io.thread_name.is_empty() {
        fail("io.thread_name", "must not be empty".into());
    }
    if io.read_buffer_size < MIN_READ_BUFFER {
        fail(
            "io.read_buffer_size",
            format!("must be at least {MIN_READ_BUFFER} bytes"),
        );
    }
    if io.listen_backlog == 0 {
        fail("io.listen_backlog", "must be positive".into());
    }
    errors
}
