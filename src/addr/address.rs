//! The address value type.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};

use super::interface;
use super::{AddressError, ElementWidth};
use crate::protocol::Family;

/// Per-family facts, looked up by family tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyLayout {
    pub family: Family,
    /// Length of the raw network-order address.
    pub octets: usize,
    /// Bind-any literal, used for passive resolution of a missing host.
    pub any: &'static str,
    /// Loopback literal, used for active resolution of a missing host.
    pub loopback: &'static str,
}

const INET: FamilyLayout = FamilyLayout {
    family: Family::Inet,
    octets: 4,
    any: "0.0.0.0",
    loopback: "127.0.0.1",
};

const INET6: FamilyLayout = FamilyLayout {
    family: Family::Inet6,
    octets: 16,
    any: "::",
    loopback: "::1",
};

/// Layout for a storable family; `None` for PF_UNSPEC and PF_UNIX.
pub fn layout(family: Family) -> Option<&'static FamilyLayout> {
    match family {
        Family::Inet => Some(&INET),
        Family::Inet6 => Some(&INET6),
        Family::Unspec | Family::Unix => None,
    }
}

/// Local literal standing in for a missing hostname.
pub fn local_literal(family: Family, passive: bool) -> Option<&'static str> {
    layout(family).map(|l| if passive { l.any } else { l.loopback })
}

/// A PF_INET or PF_INET6 endpoint.
///
/// The raw address always occupies exactly as many bytes as its family
/// demands; bytes past that length are zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    family: Family,
    octets: [u8; 16],
    port: u16,
    scope_id: Option<u32>,
    hostname: Option<String>,
}

impl Address {
    /// Parse a dotted-quad or colon-hex literal.
    ///
    /// IPv6 literals may carry a `%zone` suffix naming either an interface or
    /// a numeric scope id.
    pub fn from_presentation(literal: &str, port: u16) -> Result<Self, AddressError> {
        let format_error = || AddressError::Format {
            literal: literal.to_string(),
        };

        if !literal.contains(':') {
            let ip: Ipv4Addr = literal.parse().map_err(|_| format_error())?;
            return Self::from_bytes(Family::Inet, &ip.octets(), port, None);
        }

        let (ip, zone) = match literal.split_once('%') {
            Some((ip, zone)) => (ip, Some(zone)),
            None => (literal, None),
        };
        let ip: Ipv6Addr = ip.parse().map_err(|_| format_error())?;

        let scope_id = match zone {
            None => None,
            Some("") => return Err(format_error()),
            Some(zone) if zone.bytes().all(|b| b.is_ascii_digit()) => {
                Some(zone.parse::<u32>().map_err(|_| format_error())?)
            }
            Some(zone) => Some(
                interface::index_of(zone)
                    .ok_or_else(|| AddressError::UnknownInterface(zone.to_string()))?,
            ),
        };

        Self::from_bytes(Family::Inet6, &ip.octets(), port, scope_id)
    }

    /// Build from raw network-order bytes.
    pub fn from_bytes(
        family: Family,
        raw: &[u8],
        port: u16,
        scope_id: Option<u32>,
    ) -> Result<Self, AddressError> {
        let layout = layout(family).ok_or(AddressError::UnsupportedFamily(family))?;
        if raw.len() != layout.octets {
            return Err(AddressError::Length {
                family,
                width: ElementWidth::U8,
                expected: layout.octets,
                actual: raw.len(),
            });
        }
        if family == Family::Inet && scope_id.is_some_and(|id| id != 0) {
            return Err(AddressError::ScopeOnInet);
        }

        let mut octets = [0u8; 16];
        octets[..raw.len()].copy_from_slice(raw);
        Ok(Self {
            family,
            octets,
            port,
            scope_id: scope_id.filter(|id| *id != 0),
            hostname: None,
        })
    }

    /// Convert a native socket address, keeping any IPv6 scope id.
    pub fn from_native(addr: SocketAddr) -> Self {
        let mut octets = [0u8; 16];
        match addr {
            SocketAddr::V4(v4) => {
                octets[..4].copy_from_slice(&v4.ip().octets());
                Self {
                    family: Family::Inet,
                    octets,
                    port: v4.port(),
                    scope_id: None,
                    hostname: None,
                }
            }
            SocketAddr::V6(v6) => {
                octets.copy_from_slice(&v6.ip().octets());
                Self {
                    family: Family::Inet6,
                    octets,
                    port: v6.port(),
                    scope_id: Some(v6.scope_id()).filter(|id| *id != 0),
                    hostname: None,
                }
            }
        }
    }

    /// Same endpoint on a different port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Attach the name this address was resolved from. Empty names clear it.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        let hostname = hostname.into();
        self.hostname = (!hostname.is_empty()).then_some(hostname);
        self
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Raw network-order bytes: 4 for PF_INET, 16 for PF_INET6.
    pub fn octets(&self) -> &[u8] {
        &self.octets[..self.layout().octets]
    }

    /// Interface index of an IPv6 zone, if any.
    pub fn scope_id(&self) -> Option<u32> {
        self.scope_id
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    pub fn layout(&self) -> &'static FamilyLayout {
        match self.family {
            Family::Inet6 => &INET6,
            _ => &INET,
        }
    }

    pub fn ip(&self) -> IpAddr {
        match self.family {
            Family::Inet6 => IpAddr::V6(Ipv6Addr::from(self.octets)),
            _ => {
                let [a, b, c, d, ..] = self.octets;
                IpAddr::V4(Ipv4Addr::new(a, b, c, d))
            }
        }
    }

    /// Native socket address for binding or connecting.
    pub fn to_socket_addr(&self) -> SocketAddr {
        match self.ip() {
            IpAddr::V4(ip) => SocketAddr::V4(SocketAddrV4::new(ip, self.port)),
            IpAddr::V6(ip) => SocketAddr::V6(SocketAddrV6::new(
                ip,
                self.port,
                0,
                self.scope_id.unwrap_or(0),
            )),
        }
    }

    /// Canonical literal. An IPv6 zone is rendered as the interface name
    /// when the index still names one, else as the number.
    pub fn to_presentation(&self) -> String {
        let ip = self.ip();
        match self.scope_id {
            Some(id) => {
                let zone = interface::name_of(id).unwrap_or_else(|| id.to_string());
                format!("{ip}%{zone}")
            }
            None => ip.to_string(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_presentation())
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        Self::from_native(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dotted_quad() {
        let addr = Address::from_presentation("192.168.1.20", 8080).unwrap();
        assert_eq!(addr.family(), Family::Inet);
        assert_eq!(addr.octets(), &[192, 168, 1, 20]);
        assert_eq!(addr.port(), 8080);
        assert_eq!(addr.to_presentation(), "192.168.1.20");
    }

    #[test]
    fn parses_colon_hex() {
        let addr = Address::from_presentation("2001:db8::1", 443).unwrap();
        assert_eq!(addr.family(), Family::Inet6);
        assert_eq!(addr.octets().len(), 16);
        assert_eq!(addr.octets()[0..2], [0x20, 0x01]);
        assert_eq!(addr.octets()[15], 1);
        assert_eq!(addr.to_presentation(), "2001:db8::1");
    }

    #[test]
    fn rejects_malformed_literals() {
        for literal in ["", "1.2.3", "256.1.1.1", "::g", "fe80::1%", "example.com"] {
            assert!(
                matches!(
                    Address::from_presentation(literal, 0),
                    Err(AddressError::Format { .. })
                ),
                "{literal} should not parse"
            );
        }
    }

    #[test]
    fn numeric_zone_is_kept_as_scope() {
        let addr = Address::from_presentation("fe80::1%4000000", 0).unwrap();
        assert_eq!(addr.scope_id(), Some(4_000_000));
        // No such interface, so the number is rendered back.
        assert_eq!(addr.to_presentation(), "fe80::1%4000000");
    }

    #[test]
    fn unknown_zone_name_is_rejected() {
        let err = Address::from_presentation("fe80::1%nosuchif9", 0).unwrap_err();
        assert_eq!(err, AddressError::UnknownInterface("nosuchif9".into()));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn zone_renders_as_interface_name() {
        let Some(index) = interface::index_of("lo") else {
            return;
        };
        let addr = Address::from_bytes(Family::Inet6, &Ipv6Addr::LOCALHOST.octets(), 0, Some(index))
            .unwrap();
        assert_eq!(addr.to_presentation(), "::1%lo");
        let reparsed = Address::from_presentation("::1%lo", 0).unwrap();
        assert_eq!(reparsed.scope_id(), Some(index));
    }

    #[test]
    fn from_bytes_checks_length() {
        let err = Address::from_bytes(Family::Inet, &[1, 2, 3], 0, None).unwrap_err();
        assert_eq!(
            err,
            AddressError::Length {
                family: Family::Inet,
                width: ElementWidth::U8,
                expected: 4,
                actual: 3
            }
        );
        assert!(Address::from_bytes(Family::Inet6, &[0; 4], 0, None).is_err());
        assert!(matches!(
            Address::from_bytes(Family::Unix, &[0; 4], 0, None),
            Err(AddressError::UnsupportedFamily(Family::Unix))
        ));
    }

    #[test]
    fn ipv4_refuses_a_scope() {
        assert_eq!(
            Address::from_bytes(Family::Inet, &[127, 0, 0, 1], 0, Some(3)),
            Err(AddressError::ScopeOnInet)
        );
    }

    #[test]
    fn native_conversion_keeps_scope() {
        let native: SocketAddr = "[fe80::2%7]:9000".parse().unwrap();
        let addr = Address::from_native(native);
        assert_eq!(addr.family(), Family::Inet6);
        assert_eq!(addr.port(), 9000);
        assert_eq!(addr.scope_id(), Some(7));
        assert_eq!(addr.to_socket_addr(), native);
    }

    #[test]
    fn local_literals_by_family() {
        assert_eq!(local_literal(Family::Inet, true), Some("0.0.0.0"));
        assert_eq!(local_literal(Family::Inet, false), Some("127.0.0.1"));
        assert_eq!(local_literal(Family::Inet6, true), Some("::"));
        assert_eq!(local_literal(Family::Inet6, false), Some("::1"));
        assert_eq!(local_literal(Family::Unspec, true), None);
    }

    #[test]
    fn empty_hostname_clears() {
        let addr = Address::from_presentation("10.0.0.1", 0)
            .unwrap()
            .with_hostname("gateway");
        assert_eq!(addr.hostname(), Some("gateway"));
        assert_eq!(addr.with_hostname("").hostname(), None);
    }
}
