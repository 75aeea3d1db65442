//! Socket address, name resolution and completion-driven TCP I/O for a
//! cooperative scheduler.

pub mod addr;
pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod protocol;
pub mod resolve;

pub use addr::Address;
pub use config::schema::BridgeConfig;
pub use lifecycle::Shutdown;
pub use net::IoBridge;
pub use resolve::{Hints, Resolver};
