//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (completion, byte, resolution counters and the handle gauge)
//!
//! Consumers:
//!     → stderr log output (EnvFilter controlled)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Recording is always safe; without an installed recorder the macros are no-ops
//! - Completion outcomes are labelled, never logged per byte

pub mod logging;
pub mod metrics;
