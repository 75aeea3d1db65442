//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BridgeConfig (validated, immutable)
//!     → handed by reference to Resolver::new / IoBridge::start
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the solution table and worker pool
//!   are built from it once per process
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::BridgeConfig;
pub use schema::IoConfig;
pub use schema::ObservabilityConfig;
pub use schema::ResolverConfig;
pub use schema::ServerConfig;
