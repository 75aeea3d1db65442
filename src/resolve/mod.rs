//! Name resolution subsystem.
//!
//! # Data Flow
//! ```text
//! (host?, port, Hints)
//!     → resolver.rs (validate hints, pick local literals for a missing host)
//!     → service.rs  (interface scan when ADDRCONFIG, OS lookup per name)
//!     → solution.rs (filter each address through the solution table)
//!     → Vec<Resolved> in lookup order, then table order
//! ```
//!
//! # Design Decisions
//! - The solution table is built once from configuration and shared by
//!   reference; nothing reads ambient process state
//! - OS lookups sit behind the `NameService` trait so ordering and
//!   filtering can be exercised without a network
//! - Failures are surfaced, never retried

pub mod resolver;
pub mod service;
pub mod solution;

use thiserror::Error;

use crate::protocol::{Family, Protocol, SocketType, UnknownCode};

pub use resolver::{Resolved, Resolver};
pub use service::{NameService, SystemNameService};
pub use solution::{Solution, SolutionTable};

/// Errors raised by [`Resolver::resolve`].
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Caller misuse: bad family/type/protocol/port combination.
    #[error("{0}")]
    Validation(String),

    /// The OS lookup failed.
    #[error("Error resolving hostname: {0}")]
    Lookup(String),
}

impl From<UnknownCode> for ResolveError {
    fn from(err: UnknownCode) -> Self {
        ResolveError::Validation(err.to_string())
    }
}

/// Resolution flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ResolveFlags(u32);

impl ResolveFlags {
    pub const NONE: ResolveFlags = ResolveFlags(0);
    /// Only return families configured on a local interface.
    pub const ADDRCONFIG: ResolveFlags = ResolveFlags(0b01);
    /// A missing host means "bind to any" rather than loopback.
    pub const PASSIVE: ResolveFlags = ResolveFlags(0b10);

    /// Keep only the known bits.
    pub const fn from_bits_truncate(bits: u32) -> Self {
        ResolveFlags(bits & 0b11)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: ResolveFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for ResolveFlags {
    type Output = ResolveFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        ResolveFlags(self.0 | rhs.0)
    }
}

/// Family/type/protocol hints plus flags for one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hints {
    pub family: Family,
    pub socket_type: SocketType,
    pub protocol: Protocol,
    pub flags: ResolveFlags,
}

impl Default for Hints {
    fn default() -> Self {
        Self {
            family: Family::Unspec,
            socket_type: SocketType::Any,
            protocol: Protocol::Any,
            flags: ResolveFlags::NONE,
        }
    }
}

impl Hints {
    /// Hints from the runtime's raw numeric codes.
    pub fn from_codes(family: i32, socket_type: i32, protocol: i32, flags: u32) -> Result<Self, ResolveError> {
        Ok(Self {
            family: Family::try_from(family)?,
            socket_type: SocketType::try_from(socket_type)?,
            protocol: Protocol::try_from(protocol)?,
            flags: ResolveFlags::from_bits_truncate(flags),
        })
    }

    pub fn family(mut self, family: Family) -> Self {
        self.family = family;
        self
    }

    pub fn socket_type(mut self, socket_type: SocketType) -> Self {
        self.socket_type = socket_type;
        self
    }

    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn flags(mut self, flags: ResolveFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn is_passive(&self) -> bool {
        self.flags.contains(ResolveFlags::PASSIVE)
    }

    pub fn respects_interfaces(&self) -> bool {
        self.flags.contains(ResolveFlags::ADDRCONFIG)
    }
}
