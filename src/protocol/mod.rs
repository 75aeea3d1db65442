//! Socket family, type and protocol enumerations.
//!
//! # Codes
//! ```text
//! Family:     PF_UNSPEC=0  PF_INET=1      PF_INET6=2    PF_UNIX=3
//! SocketType: SOCK_ANY=0   SOCK_STREAM=1  SOCK_DGRAM=2  SOCK_RAW=3  SOCK_RDM=4  SOCK_SEQPACKET=5
//! Protocol:   IPPROTO_ANY=0  IPPROTO_TCP=1  IPPROTO_UDP=2
//! ```
//!
//! # Design Decisions
//! - Closed sets: codes outside the table never convert
//! - Codes are the runtime's own, not the host OS constants
//! - Compatibility checks live in `compat.rs` and work on raw codes

pub mod compat;

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use compat::{check_family, check_protocol, check_type};

/// A numeric code that is not part of a closed enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown {kind} code: {code}")]
pub struct UnknownCode {
    pub kind: &'static str,
    pub code: i32,
}

/// A name that is not part of a closed enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} name: {name}")]
pub struct ParseNameError {
    pub kind: &'static str,
    pub name: String,
}

macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal, $prefix:literal {
            $( $(#[$vmeta:meta])* $variant:ident = $code:literal, $short:literal; )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every member, in code order.
            pub const ALL: &'static [$name] = &[ $( $name::$variant, )+ ];

            /// Stable numeric code.
            pub const fn code(self) -> i32 {
                match self {
                    $( $name::$variant => $code, )+
                }
            }

            /// Canonical constant name, e.g. `PF_INET6`.
            pub const fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => concat!($prefix, $short), )+
                }
            }
        }

        impl TryFrom<i32> for $name {
            type Error = UnknownCode;

            fn try_from(code: i32) -> Result<Self, Self::Error> {
                match code {
                    $( $code => Ok($name::$variant), )+
                    _ => Err(UnknownCode { kind: $kind, code }),
                }
            }
        }

        impl From<$name> for i32 {
            fn from(value: $name) -> i32 {
                value.code()
            }
        }

        impl FromStr for $name {
            type Err = ParseNameError;

            /// Accepts the canonical name or the bare suffix, case-insensitively.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let upper = s.trim().to_ascii_uppercase();
                let bare = upper.strip_prefix($prefix).unwrap_or(&upper);
                match bare {
                    $( $short => Ok($name::$variant), )+
                    _ => Err(ParseNameError { kind: $kind, name: s.to_string() }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

closed_enum! {
    /// Address protocol family.
    Family, "family", "PF_" {
        /// Wildcard: any family.
        Unspec = 0, "UNSPEC";
        Inet = 1, "INET";
        Inet6 = 2, "INET6";
        Unix = 3, "UNIX";
    }
}

closed_enum! {
    /// Socket type.
    SocketType, "socket type", "SOCK_" {
        /// Wildcard: any type except raw.
        Any = 0, "ANY";
        Stream = 1, "STREAM";
        Dgram = 2, "DGRAM";
        Raw = 3, "RAW";
        Rdm = 4, "RDM";
        SeqPacket = 5, "SEQPACKET";
    }
}

closed_enum! {
    /// Transport protocol.
    Protocol, "protocol", "IPPROTO_" {
        /// Wildcard: any protocol.
        Any = 0, "ANY";
        Tcp = 1, "TCP";
        Udp = 2, "UDP";
    }
}

impl Family {
    /// Family of a native IP address.
    pub fn of(addr: &std::net::SocketAddr) -> Self {
        match addr {
            std::net::SocketAddr::V4(_) => Family::Inet,
            std::net::SocketAddr::V6(_) => Family::Inet6,
        }
    }

    /// Whether this is the wildcard family.
    pub fn is_unspec(self) -> bool {
        self == Family::Unspec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(Family::Inet.code(), 1);
        assert_eq!(Family::Inet6.code(), 2);
        assert_eq!(SocketType::Raw.code(), 3);
        assert_eq!(SocketType::SeqPacket.code(), 5);
        assert_eq!(Protocol::Udp.code(), 2);
    }

    #[test]
    fn unknown_codes_are_rejected() {
        assert_eq!(
            Family::try_from(9),
            Err(UnknownCode { kind: "family", code: 9 })
        );
        assert!(SocketType::try_from(-1).is_err());
        assert!(Protocol::try_from(3).is_err());
    }

    #[test]
    fn every_member_round_trips_through_its_code() {
        for family in Family::ALL {
            assert_eq!(Family::try_from(family.code()), Ok(*family));
        }
        for ty in SocketType::ALL {
            assert_eq!(SocketType::try_from(ty.code()), Ok(*ty));
        }
        for proto in Protocol::ALL {
            assert_eq!(Protocol::try_from(proto.code()), Ok(*proto));
        }
    }

    #[test]
    fn names_parse_in_both_forms() {
        assert_eq!("PF_INET6".parse::<Family>().unwrap(), Family::Inet6);
        assert_eq!("inet".parse::<Family>().unwrap(), Family::Inet);
        assert_eq!("stream".parse::<SocketType>().unwrap(), SocketType::Stream);
        assert_eq!("IPPROTO_udp".parse::<Protocol>().unwrap(), Protocol::Udp);
        assert!("PF_APPLETALK".parse::<Family>().is_err());
    }

    #[test]
    fn display_uses_canonical_name() {
        assert_eq!(Family::Unspec.to_string(), "PF_UNSPEC");
        assert_eq!(SocketType::Dgram.to_string(), "SOCK_DGRAM");
        assert_eq!(Protocol::Tcp.to_string(), "IPPROTO_TCP");
    }
}
