//! Address model subsystem.
//!
//! # Data Flow
//! ```text
//! "fe80::1%eth0" ─┐
//! raw bytes ──────┼→ address.rs (Address: family tag + 16-byte array + port + zone)
//! SocketAddr ─────┤        │
//! record ─────────┘        ├→ buffer.rs    (uint8/16/32/64 element packing)
//!                          ├→ interface.rs (scope id ↔ interface name)
//!                          └→ codec.rs     (persisted record layout)
//! ```
//!
//! # Design Decisions
//! - One value type for both IP families; per-family facts live in a
//!   static layout table keyed by the family tag
//! - Zone names are resolved when rendering, never stored
//! - Addresses are immutable; `with_*` builders return new values

pub mod address;
pub mod buffer;
pub mod codec;
pub mod interface;

use thiserror::Error;

use crate::protocol::Family;

pub use address::{layout, local_literal, Address, FamilyLayout};
pub use buffer::{AddressBuffer, ElementWidth};
pub use codec::{
    deserialize_address, serialize_address, BinaryReader, BinaryWriter, CodecError,
    SerializationReader, SerializationWriter,
};
pub use interface::LocalFamilies;

/// Errors raised while building or converting an [`Address`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The literal is not a valid address for any supported family.
    #[error("invalid address literal: {literal}")]
    Format { literal: String },

    /// Raw bytes or buffer elements do not fit the family.
    #[error("{family} address {width} buffer must have {expected} elements, got {actual}")]
    Length {
        family: Family,
        width: ElementWidth,
        expected: usize,
        actual: usize,
    },

    /// The family cannot be expressed in the requested element width.
    #[error("{family} addresses cannot be packed into {width} elements")]
    Width { family: Family, width: ElementWidth },

    /// IPv4 addresses have no zone.
    #[error("a scope id cannot be attached to an IPv4 address")]
    ScopeOnInet,

    /// The zone suffix names no local interface.
    #[error("unknown network interface: {0}")]
    UnknownInterface(String),

    /// Only PF_INET and PF_INET6 addresses are stored.
    #[error("unsupported address family: {0}")]
    UnsupportedFamily(Family),
}
