//! OS-facing lookups behind a trait.

use std::io;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

use crate::addr::{interface, Address, LocalFamilies};

/// The host's name lookup and interface tables.
pub trait NameService: Send + Sync {
    /// Every native address for `host`, in the order the OS returns them.
    /// Ports in the result are ignored.
    fn lookup(&self, host: &str) -> io::Result<Vec<SocketAddr>>;

    /// Families configured on local interfaces.
    fn local_families(&self) -> io::Result<LocalFamilies>;
}

/// `getaddrinfo(3)` and `getifaddrs(3)` backed service.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemNameService;

impl NameService for SystemNameService {
    fn lookup(&self, host: &str) -> io::Result<Vec<SocketAddr>> {
        // Literals never leave the process.
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![SocketAddr::new(ip, 0)]);
        }
        if let Ok(address) = Address::from_presentation(host, 0) {
            return Ok(vec![address.to_socket_addr()]);
        }

        let found: Vec<SocketAddr> = (host, 0).to_socket_addrs()?.collect();
        tracing::trace!(host, count = found.len(), "OS lookup finished");
        Ok(found)
    }

    fn local_families(&self) -> io::Result<LocalFamilies> {
        interface::local_families()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_short_circuit() {
        let found = SystemNameService.lookup("192.0.2.7").unwrap();
        assert_eq!(found, vec!["192.0.2.7:0".parse::<SocketAddr>().unwrap()]);

        let found = SystemNameService.lookup("fe80::1%3").unwrap();
        match found[0] {
            SocketAddr::V6(v6) => assert_eq!(v6.scope_id(), 3),
            SocketAddr::V4(_) => panic!("expected an IPv6 address"),
        }
    }

    #[test]
    fn localhost_resolves() {
        let found = SystemNameService.lookup("localhost").unwrap();
        assert!(found.iter().all(|a| a.ip().is_loopback()));
        assert!(!found.is_empty());
    }
}
