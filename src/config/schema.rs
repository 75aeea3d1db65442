//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BridgeConfig {
    /// Name resolution settings.
    pub resolver: ResolverConfig,

    /// Completion worker pool and buffer sizes.
    pub io: IoConfig,

    /// Echo daemon listener.
    pub server: ServerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Resolver configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ResolverConfig {
    /// Order IPv4 ahead of IPv6 in the solution table and for missing hosts.
    pub prefer_ipv4: bool,
}

/// Async I/O configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IoConfig {
    /// Completion worker threads.
    pub worker_threads: usize,

    /// Name prefix for worker threads.
    pub thread_name: String,

    /// Streaming read buffer size in bytes.
    pub read_buffer_size: usize,

    /// Default listen backlog.
    pub listen_backlog: u32,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            thread_name: "netbridge-io".to_string(),
            read_buffer_size: 32 * 1024,
            listen_backlog: 128,
        }
    }
}

/// Echo daemon configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind; resolved passively. `None` binds every local family.
    pub bind_host: Option<String>,

    /// Port to bind.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: Some("localhost".to_string()),
            port: 7070,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
